/// Kaplan-Meier survival curve for survival analysis.
///
/// The Kaplan-Meier estimator is a non-parametric statistic used to estimate the survival
/// function from lifetime data. It accounts for censored data (observations where the event
/// of interest has not occurred by the end of the study period).
///
/// # Fields
///
/// The curve stores parallel vectors representing the survival function at discrete time points:
/// - Time points where events occurred
/// - Survival probability at each time point
/// - Number of subjects at risk at each time point
/// - Number of events (non-censored observations) at each time point
#[derive(Debug, Clone, PartialEq)]
pub struct KaplanMeierCurve {
    /// Time points where events (non-censored observations) occurred.
    pub times: Vec<f64>,
    /// Survival probability at each corresponding time point.
    /// Values range from 0.0 (no survival) to 1.0 (complete survival).
    pub survival_prob: Vec<f64>,
    /// Number of subjects at risk (not yet experienced the event or censored) at each time point.
    pub at_risk: Vec<usize>,
    /// Number of events (non-censored observations) that occurred at each time point.
    pub events: Vec<usize>,
    /// Number of observations the curve was fitted on.
    pub total: usize,
}

/// A single vertex of the survival step function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPoint {
    pub time: f64,
    pub survival_prob: f64,
    pub at_risk: usize,
    pub events: usize,
}

impl KaplanMeierCurve {
    /// Computes the Kaplan-Meier survival curve from survival data.
    ///
    /// # Arguments
    ///
    /// * `data` - A vector of tuples where each tuple contains:
    ///   - `time`: The time at which the observation occurred
    ///   - `is_censored`: `true` if the observation was censored (event did not occur),
    ///     `false` if the event occurred
    ///
    /// # Examples
    ///
    /// ```
    /// # use oobkm_stats::survival::KaplanMeierCurve;
    /// // Data: (time, is_censored)
    /// let data = vec![
    ///     (10.0, false), // Event at time 10
    ///     (20.0, true),  // Censored at time 20
    ///     (30.0, false), // Event at time 30
    /// ];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// assert_eq!(curve.times, vec![10.0, 30.0]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_data(mut data: Vec<(f64, bool)>) -> Self {
        if data.is_empty() {
            return Self {
                times: vec![],
                survival_prob: vec![],
                at_risk: vec![],
                events: vec![],
                total: 0,
            };
        }

        data.sort_by(|(a, _), (b, _)| a.total_cmp(b));

        let mut times = vec![];
        let mut survival_prob = vec![];
        let mut at_risk_vec = vec![];
        let mut events_vec = vec![];

        let mut current_survival = 1.0;
        let total = data.len();

        let mut i = 0;
        while i < data.len() {
            let current_time = data[i].0;
            let at_risk = total - i;

            // Censored observations at the event time still count as at risk
            let mut event_count = 0;
            let mut j = i;
            while j < data.len() && data[j].0 == current_time {
                if !data[j].1 {
                    event_count += 1;
                }
                j += 1;
            }

            if event_count > 0 {
                let survival_rate = 1.0 - (event_count as f64 / at_risk as f64);
                current_survival *= survival_rate;

                times.push(current_time);
                survival_prob.push(current_survival);
                at_risk_vec.push(at_risk);
                events_vec.push(event_count);
            }

            i = j;
        }

        Self {
            times,
            survival_prob,
            at_risk: at_risk_vec,
            events: events_vec,
            total,
        }
    }

    /// Returns `true` if no event was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns the median survival time.
    ///
    /// The median survival time is the time at which the survival probability
    /// drops to or below 50%. If the survival probability never reaches 50%,
    /// this method returns `None`.
    ///
    /// Linear interpolation is used between time points.
    ///
    /// # Examples
    ///
    /// ```
    /// # use oobkm_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10.0, false), (20.0, false), (30.0, false), (40.0, false)];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// assert_eq!(curve.median_survival(), Some(20.0));
    /// ```
    #[must_use]
    pub fn median_survival(&self) -> Option<f64> {
        let i = self.survival_prob.iter().position(|&s| s <= 0.5)?;
        if i == 0 {
            return Some(self.times[0]);
        }
        let t0 = self.times[i - 1];
        let t1 = self.times[i];
        let s0 = self.survival_prob[i - 1];
        let s1 = self.survival_prob[i];
        Some(t0 + (0.5 - s0) / (s1 - s0) * (t1 - t0))
    }

    /// Returns the survival probability at a specific time.
    ///
    /// The survival probability remains constant between event times and
    /// decreases only when an event occurs. Returns `1.0` before the first event.
    ///
    /// # Examples
    ///
    /// ```
    /// # use oobkm_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10.0, false), (20.0, false)];
    /// let curve = KaplanMeierCurve::from_data(data);
    ///
    /// assert_eq!(curve.survival_at(5.0), 1.0);
    /// assert_eq!(curve.survival_at(15.0), 0.5);
    /// assert_eq!(curve.survival_at(25.0), 0.0);
    /// ```
    #[must_use]
    pub fn survival_at(&self, time: f64) -> f64 {
        match self.times.iter().rposition(|&t| t <= time) {
            Some(i) => self.survival_prob[i],
            None => 1.0,
        }
    }

    /// Returns the vertices of the survival step function, starting at `(0, 1.0)`.
    ///
    /// The origin vertex is always present. An event at time 0 adds a second
    /// vertex at the same time with the dropped probability.
    ///
    /// A plotting tool draws the curve by holding each probability until the
    /// next point's time ("post" step style).
    ///
    /// # Examples
    ///
    /// ```
    /// # use oobkm_stats::survival::KaplanMeierCurve;
    /// let curve = KaplanMeierCurve::from_data(vec![(3.0, false), (5.0, true)]);
    /// let steps = curve.step_points();
    /// assert_eq!(steps.len(), 2);
    /// assert_eq!((steps[0].time, steps[0].survival_prob), (0.0, 1.0));
    /// assert_eq!((steps[1].time, steps[1].survival_prob), (3.0, 0.5));
    /// ```
    #[must_use]
    pub fn step_points(&self) -> Vec<StepPoint> {
        let mut points = Vec::with_capacity(self.times.len() + 1);
        points.push(StepPoint {
            time: 0.0,
            survival_prob: 1.0,
            at_risk: self.total,
            events: 0,
        });
        points.extend(
            self.times
                .iter()
                .zip(&self.survival_prob)
                .zip(self.at_risk.iter().zip(&self.events))
                .map(|((&time, &survival_prob), (&at_risk, &events))| StepPoint {
                    time,
                    survival_prob,
                    at_risk,
                    events,
                }),
        );
        points
    }
}
