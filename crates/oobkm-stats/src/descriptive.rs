/// Descriptive statistics summarizing a dataset.
///
/// This structure contains common measures of central tendency, dispersion,
/// and spread for a dataset of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of values in the dataset.
    pub count: usize,
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean (average) of the dataset.
    pub mean: f64,
    /// The median value of the dataset (average of the two middle values for even counts).
    pub median: f64,
    /// The population variance of the dataset.
    pub variance: f64,
    /// The standard deviation of the dataset.
    pub std_dev: f64,
    /// Number of distinct values in the dataset.
    pub distinct_count: usize,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// This method will sort the values internally before computing statistics.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use oobkm_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, 1.0, 3.0, 6.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 6.0);
    /// assert_eq!(stats.mean, 3.5);
    /// assert_eq!(stats.median, 3.5);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted values.
    ///
    /// This is an optimized version that skips the sorting step.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use oobkm_stats::descriptive::DescriptiveStats;
    /// let mut values = [5.0, 2.0, 4.0, 1.0, 3.0];
    /// values.sort_by(f64::total_cmp);
    /// let stats = DescriptiveStats::from_sorted(&values).unwrap();
    /// assert_eq!(stats.median, 3.0);
    /// assert_eq!(stats.distinct_count, 5);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let median = median(sorted_values)?;
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();
        let distinct_count = count_distinct(sorted_values);

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            variance,
            std_dev,
            distinct_count,
        })
    }
}

/// Returns the median of pre-sorted values.
///
/// For an even number of values the median is the average of the two middle
/// values. Returns `None` for an empty slice.
///
/// # Examples
///
/// ```
/// # use oobkm_stats::descriptive::median;
/// assert_eq!(median(&[1.0, 2.0, 3.0]), Some(2.0));
/// assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), Some(2.5));
/// assert_eq!(median(&[]), None);
/// ```
#[must_use]
pub fn median(sorted_values: &[f64]) -> Option<f64> {
    debug_assert!(
        sorted_values.is_sorted_by(|a, b| a <= b),
        "values must be sorted in ascending order"
    );

    let len = sorted_values.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        Some(sorted_values[mid])
    } else {
        Some(f64::midpoint(sorted_values[mid - 1], sorted_values[mid]))
    }
}

/// Counts distinct values in a sorted slice.
///
/// Values are compared exactly; `0.0` and `-0.0` count as one value.
#[must_use]
pub fn count_distinct(sorted_values: &[f64]) -> usize {
    if sorted_values.is_empty() {
        return 0;
    }
    1 + sorted_values.windows(2).filter(|w| w[0] != w[1]).count()
}
