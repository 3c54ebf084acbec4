/// Incremental average without storing any history:
/// `avg = (avg * (n - 1) + x) / n`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningAverage {
    value: f32,
    weight: u16,
    max_weight: u16,
}

impl RunningAverage {
    /// The window starts at one sample and grows by one with every sample until `max` is reached.
    /// The first sample therefore replaces the value completely.
    pub const fn growing(max: u16) -> Self {
        Self {
            value: 0.0,
            weight: 1,
            max_weight: max,
        }
    }

    /// Fixed window of `n` samples starting from zero. The value converges towards the input
    /// over roughly `n` samples.
    pub const fn fixed(n: u16) -> Self {
        Self {
            value: 0.0,
            weight: n,
            max_weight: n,
        }
    }

    /// Feed a new sample and return the updated average
    pub fn add(&mut self, sample: f32) -> f32 {
        let n = self.weight.max(1) as f32;
        self.value = (self.value * (n - 1.0) + sample) / n;
        if self.weight < self.max_weight {
            self.weight += 1;
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Current window size used for the next sample
    pub fn weight(&self) -> u16 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growing_first_sample_replaces_value() {
        let mut avg = RunningAverage::growing(10);
        assert_eq!(avg.add(21.5), 21.5);
        assert_eq!(avg.weight(), 2);
    }

    #[test]
    fn test_growing_is_arithmetic_mean_until_full() {
        let mut avg = RunningAverage::growing(10);
        for sample in [10.0, 20.0, 30.0, 40.0] {
            avg.add(sample);
        }
        assert!((avg.value() - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_growing_window_saturates() {
        let mut avg = RunningAverage::growing(10);
        for _ in 0..25 {
            avg.add(1.0);
        }
        assert_eq!(avg.weight(), 10);
        avg.add(11.0);
        assert!((avg.value() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_fixed_window_starts_from_zero() {
        let mut avg = RunningAverage::fixed(15);
        let first = avg.add(-1.0);
        assert!((first - (-1.0 / 15.0)).abs() < 1e-6);
        for _ in 0..200 {
            avg.add(-1.0);
        }
        assert!((avg.value() + 1.0).abs() < 1e-3);
        assert_eq!(avg.weight(), 15);
    }
}
