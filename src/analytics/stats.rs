use serde::Serialize;

/// `describe()`-style summary of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

/// Data behind a horizontal box plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Lowest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Highest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    /// Values outside the whiskers.
    pub outliers: usize,
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Linear-interpolated quantile of already sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Summary of the finite values; `None` when there are none.
pub fn describe(values: &[f64]) -> Option<Summary> {
    let v = sorted(values);
    let n = v.len();
    if n == 0 {
        return None;
    }
    let mean = v.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    });
    Some(Summary {
        count: n,
        mean,
        std,
        min: v[0],
        p25: quantile(&v, 0.25),
        median: quantile(&v, 0.5),
        p75: quantile(&v, 0.75),
        max: v[n - 1],
    })
}

/// Box-plot statistics with Tukey whiskers; `None` when there is no data.
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let v = sorted(values);
    let (&min, &max) = (v.first()?, v.last()?);
    let q1 = quantile(&v, 0.25);
    let q3 = quantile(&v, 0.75);
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside: Vec<f64> = v
        .iter()
        .copied()
        .filter(|x| *x >= lo_fence && *x <= hi_fence)
        .collect();

    Some(BoxStats {
        min,
        q1,
        median: quantile(&v, 0.5),
        q3,
        max,
        lower_whisker: inside.first().copied().unwrap_or(q1),
        upper_whisker: inside.last().copied().unwrap_or(q3),
        outliers: v.len() - inside.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_matches_linear_quantiles() {
        let s = describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.p25, 1.75);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.p75, 3.25);
        assert_eq!(s.max, 4.0);
        let std = s.std.unwrap();
        assert!((std - 1.290_994_448_7).abs() < 1e-9);
    }

    #[test]
    fn single_value_has_no_std() {
        let s = describe(&[7.0]).unwrap();
        assert_eq!(s.std, None);
        assert_eq!(s.median, 7.0);
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn box_stats_flags_outliers() {
        let b = box_stats(&[1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 50.0]).unwrap();
        assert_eq!(b.q1, 2.0);
        assert_eq!(b.median, 3.0);
        assert_eq!(b.q3, 3.5);
        assert_eq!(b.lower_whisker, 1.0);
        assert_eq!(b.upper_whisker, 4.0);
        assert_eq!(b.outliers, 1);
        assert_eq!(b.max, 50.0);
        assert!(box_stats(&[]).is_none());
    }
}
