use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::model::{Transaction, TransactionTable};

/// How many top spenders make up the `High Value` segment.
pub const HIGH_VALUE_CUSTOMERS: usize = 100;

// ---------------------------------------------------------------------------
// CustomerSegment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CustomerSegment {
    #[default]
    All,
    /// Lines of a customer's chronologically first invoice.
    New,
    /// Customers with more than one distinct invoice.
    Repeat,
    /// The top [`HIGH_VALUE_CUSTOMERS`] customers by lifetime spend.
    #[serde(rename = "High Value", alias = "HighValue")]
    HighValue,
}

impl CustomerSegment {
    pub const ALL: [CustomerSegment; 4] = [
        CustomerSegment::All,
        CustomerSegment::New,
        CustomerSegment::Repeat,
        CustomerSegment::HighValue,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CustomerSegment::All => "All",
            CustomerSegment::New => "New",
            CustomerSegment::Repeat => "Repeat",
            CustomerSegment::HighValue => "High Value",
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CustomerSegment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "all" => Ok(CustomerSegment::All),
            "new" => Ok(CustomerSegment::New),
            "repeat" => Ok(CustomerSegment::Repeat),
            "highvalue" => Ok(CustomerSegment::HighValue),
            _ => Err(format!("unknown customer segment '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentIndex – classification against the full history
// ---------------------------------------------------------------------------

/// Per-customer facts computed once over the unfiltered table, so segment
/// membership never depends on the current filter selection.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    /// customer → invoice number of their earliest purchase
    first_invoice: HashMap<String, String>,
    repeat: HashSet<String>,
    high_value: HashSet<String>,
}

impl SegmentIndex {
    pub fn build(table: &TransactionTable) -> Self {
        struct CustomerFacts<'t> {
            first_seen: NaiveDateTime,
            first_invoice: &'t str,
            invoices: HashSet<&'t str>,
            spend: f64,
        }

        // Vec keeps first-encountered order for tie-breaking.
        let mut order: Vec<&str> = Vec::new();
        let mut facts: HashMap<&str, CustomerFacts<'_>> = HashMap::new();

        for tx in &table.rows {
            let Some(customer) = tx.customer_id() else {
                continue;
            };
            let entry = facts.entry(customer).or_insert_with(|| {
                order.push(customer);
                CustomerFacts {
                    first_seen: tx.invoice_date(),
                    first_invoice: tx.invoice_no(),
                    invoices: HashSet::new(),
                    spend: 0.0,
                }
            });
            // strict: on equal timestamps the first row read wins
            if tx.invoice_date() < entry.first_seen {
                entry.first_seen = tx.invoice_date();
                entry.first_invoice = tx.invoice_no();
            }
            entry.invoices.insert(tx.invoice_no());
            entry.spend += tx.total_price();
        }

        let mut ranked: Vec<(&str, f64)> = order.iter().map(|c| (*c, facts[c].spend)).collect();
        // stable: equal spend keeps first-encountered order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        SegmentIndex {
            first_invoice: facts
                .iter()
                .map(|(c, f)| (c.to_string(), f.first_invoice.to_string()))
                .collect(),
            repeat: facts
                .iter()
                .filter(|(_, f)| f.invoices.len() > 1)
                .map(|(c, _)| c.to_string())
                .collect(),
            high_value: ranked
                .into_iter()
                .take(HIGH_VALUE_CUSTOMERS)
                .map(|(c, _)| c.to_string())
                .collect(),
        }
    }

    /// Whether `tx` passes `segment`. Lines without a customer only pass `All`.
    pub fn matches(&self, segment: CustomerSegment, tx: &Transaction) -> bool {
        match segment {
            CustomerSegment::All => true,
            CustomerSegment::New => self.is_first_purchase(tx),
            CustomerSegment::Repeat => tx.customer_id().is_some_and(|c| self.is_repeat(c)),
            CustomerSegment::HighValue => tx.customer_id().is_some_and(|c| self.is_high_value(c)),
        }
    }

    /// The line belongs to its customer's first invoice.
    pub fn is_first_purchase(&self, tx: &Transaction) -> bool {
        tx.customer_id()
            .and_then(|c| self.first_invoice.get(c))
            .is_some_and(|inv| inv == tx.invoice_no())
    }

    pub fn is_repeat(&self, customer: &str) -> bool {
        self.repeat.contains(customer)
    }

    pub fn is_high_value(&self, customer: &str) -> bool {
        self.high_value.contains(customer)
    }

    /// Number of distinct customers in the table.
    pub fn customer_count(&self) -> usize {
        self.first_invoice.len()
    }

    /// Number of customers that belong to `segment`.
    pub fn segment_size(&self, segment: CustomerSegment) -> usize {
        match segment {
            CustomerSegment::All | CustomerSegment::New => self.first_invoice.len(),
            CustomerSegment::Repeat => self.repeat.len(),
            CustomerSegment::HighValue => self.high_value.len(),
        }
    }
}
