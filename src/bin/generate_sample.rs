//! Writes a synthetic transactions dataset (`sample_retail.csv` and
//! `sample_retail.parquet`) for trying the dashboard without the real data.

use std::sync::Arc;

use anyhow::Context;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;

const INVOICES: usize = 2_000;
const CUSTOMERS: u64 = 300;
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const COUNTRIES: [(&str, f64); 6] = [
    ("United Kingdom", 0.70),
    ("Germany", 0.08),
    ("France", 0.08),
    ("EIRE", 0.06),
    ("Spain", 0.04),
    ("Netherlands", 0.04),
];

const PRODUCTS: [(&str, &str, f64); 12] = [
    ("85123A", "WHITE HANGING HEART T-LIGHT HOLDER", 2.55),
    ("71053", "WHITE METAL LANTERN", 3.39),
    ("84406B", "CREAM CUPID HEARTS COAT HANGER", 2.75),
    ("22423", "REGENCY CAKESTAND 3 TIER", 12.75),
    ("47566", "PARTY BUNTING", 4.95),
    ("85099B", "JUMBO BAG RED RETROSPOT", 1.95),
    ("84879", "ASSORTED COLOUR BIRD ORNAMENT", 1.69),
    ("22720", "SET OF 3 CAKE TINS PANTRY DESIGN", 4.95),
    ("21212", "PACK OF 72 RETROSPOT CAKE CASES", 0.55),
    ("20725", "LUNCH BAG RED RETROSPOT", 1.65),
    ("22197", "POPCORN HOLDER", 0.85),
    ("23084", "RABBIT NIGHT LIGHT", 2.08),
];

struct Row {
    invoice_no: String,
    stock_code: &'static str,
    description: &'static str,
    quantity: i64,
    invoice_date: NaiveDateTime,
    unit_price: f64,
    customer_id: Option<String>,
    country: &'static str,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next_u64() % (hi - lo + 1)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Index drawn according to `weights` (assumed to sum to ~1).
    fn weighted(&mut self, weights: impl IntoIterator<Item = f64>) -> usize {
        let target = self.next_f64();
        let mut acc = 0.0;
        let mut last = 0;
        for (i, w) in weights.into_iter().enumerate() {
            acc += w;
            last = i;
            if target < acc {
                return i;
            }
        }
        last
    }
}

fn generate(rng: &mut SimpleRng) -> anyhow::Result<Vec<Row>> {
    let start = NaiveDate::from_ymd_opt(2010, 12, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .context("invalid start date")?;

    // Each customer shops from one country.
    let customer_country: Vec<usize> = (0..CUSTOMERS)
        .map(|_| rng.weighted(COUNTRIES.iter().map(|c| c.1)))
        .collect();

    let mut rows = Vec::new();
    for n in 0..INVOICES {
        let is_return = rng.chance(0.03);
        let invoice_no = if is_return {
            format!("C{}", 536_365 + n)
        } else {
            (536_365 + n).to_string()
        };

        // Spread over roughly a year, trading hours 8..=19.
        let day = rng.range(0, 373) as i64;
        let when = start
            + Duration::days(day)
            + Duration::hours(rng.range(0, 11) as i64)
            + Duration::minutes(rng.range(0, 59) as i64);

        let (customer_id, country) = if rng.chance(0.1) {
            (None, COUNTRIES[rng.weighted(COUNTRIES.iter().map(|c| c.1))].0)
        } else {
            let c = rng.range(0, CUSTOMERS - 1);
            (
                Some(format!("{}.0", 12_346 + c)),
                COUNTRIES[customer_country[c as usize]].0,
            )
        };

        for _ in 0..rng.range(1, 6) {
            let pick = rng.range(0, PRODUCTS.len() as u64 - 1) as usize;
            let (stock_code, description, price) = PRODUCTS[pick];
            let quantity = rng.range(1, 24) as i64;
            rows.push(Row {
                invoice_no: invoice_no.clone(),
                stock_code,
                description,
                quantity: if is_return { -quantity } else { quantity },
                invoice_date: when,
                unit_price: price,
                customer_id: customer_id.clone(),
                country,
            });
        }
    }
    Ok(rows)
}

fn write_csv(rows: &[Row], path: &str) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record([
        "InvoiceNo",
        "StockCode",
        "Description",
        "Quantity",
        "InvoiceDate",
        "UnitPrice",
        "CustomerID",
        "Country",
    ])?;
    for row in rows {
        writer.write_record([
            row.invoice_no.as_str(),
            row.stock_code,
            row.description,
            row.quantity.to_string().as_str(),
            row.invoice_date.format(DATE_FORMAT).to_string().as_str(),
            format!("{:.2}", row.unit_price).as_str(),
            row.customer_id.as_deref().unwrap_or(""),
            row.country,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &str) -> anyhow::Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("InvoiceNo", DataType::Utf8, false),
        Field::new("StockCode", DataType::Utf8, false),
        Field::new("Description", DataType::Utf8, false),
        Field::new("Quantity", DataType::Int64, false),
        Field::new("InvoiceDate", DataType::Utf8, false),
        Field::new("UnitPrice", DataType::Float64, false),
        Field::new("CustomerID", DataType::Utf8, true),
        Field::new("Country", DataType::Utf8, false),
    ]));

    let dates: Vec<String> = rows
        .iter()
        .map(|r| r.invoice_date.format(DATE_FORMAT).to_string())
        .collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.invoice_no.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.stock_code))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.description))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.quantity))),
            Arc::new(StringArray::from_iter_values(dates.iter().map(String::as_str))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.unit_price))),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.customer_id.as_deref()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.country))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng)?;

    write_csv(&rows, "sample_retail.csv")?;
    write_parquet(&rows, "sample_retail.parquet")?;

    let returns = rows.iter().filter(|r| r.quantity < 0).count();
    let anonymous = rows.iter().filter(|r| r.customer_id.is_none()).count();
    println!(
        "Wrote {} transactions ({INVOICES} invoices, {returns} return lines, {anonymous} without customer) \
         to sample_retail.csv and sample_retail.parquet",
        rows.len()
    );
    Ok(())
}
