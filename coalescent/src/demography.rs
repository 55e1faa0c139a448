//! Demography -- the relative population size as a function of (backward) time.
//!
//! The history is a list of epochs. Each epoch starts at some time and either keeps
//! the size constant or lets it shrink exponentially (backwards in time) at rate `alpha`.
//! An exponential epoch starts from whatever size the previous epoch had reached,
//! so the size is continuous across such boundaries.
use definitions::{ConfigError, PopulationModel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    pub start: f64,
    pub initial_size: f64,
    pub alpha: f64,
}

impl Epoch {
    pub fn size_at(&self, time: f64) -> f64 {
        self.initial_size * (-self.alpha * (time - self.start)).exp()
    }
    /// Waiting time from `time` to the next event of a process firing at `rate / size(t)`,
    /// given a unit exponential draw `unit`. Infinite if it never fires.
    pub fn waiting_time(&self, time: f64, rate: f64, unit: f64) -> f64 {
        if rate <= 0f64 {
            return f64::INFINITY;
        }
        let size = self.size_at(time);
        if self.alpha == 0f64 {
            return unit * size / rate;
        }
        // Inverse of the integrated rate.
        let x = unit * self.alpha * size / rate;
        if x <= -1f64 {
            f64::INFINITY
        } else {
            x.ln_1p() / self.alpha
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Demography {
    epochs: Vec<Epoch>,
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::InvalidParameter {
        name: "population_models",
        reason,
    }
}

impl Demography {
    /// Build the epochs from the models. Before the first model (or without any),
    /// the population has the constant size 1.
    pub fn new(models: &[PopulationModel]) -> Result<Self, ConfigError> {
        let mut epochs: Vec<Epoch> = vec![];
        if models.first().map(|m| m.start_time() > 0f64).unwrap_or(true) {
            epochs.push(Epoch {
                start: 0f64,
                initial_size: 1f64,
                alpha: 0f64,
            });
        }
        for model in models {
            let start = model.start_time();
            if !start.is_finite() || start < 0f64 {
                return Err(invalid(format!("start time {} is not a time", start)));
            }
            let previous = epochs.last().copied();
            if let Some(prev) = previous {
                if start < prev.start {
                    let msg = format!("start time {} comes before {}", start, prev.start);
                    return Err(invalid(msg));
                }
            }
            let epoch = match *model {
                PopulationModel::Constant { size, .. } => Epoch {
                    start,
                    initial_size: size,
                    alpha: 0f64,
                },
                PopulationModel::Exponential { alpha, .. } => {
                    if !alpha.is_finite() {
                        return Err(invalid(format!("growth rate {} is not finite", alpha)));
                    }
                    let initial_size = previous.map(|p| p.size_at(start)).unwrap_or(1f64);
                    Epoch {
                        start,
                        initial_size,
                        alpha,
                    }
                }
            };
            if !(epoch.initial_size.is_finite() && 0f64 < epoch.initial_size) {
                let msg = format!("size {} at time {}", epoch.initial_size, start);
                return Err(invalid(msg));
            }
            epochs.push(epoch);
        }
        Ok(Self { epochs })
    }
    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }
    /// The start of the epoch after `idx`. Infinite for the last one.
    pub fn next_start(&self, idx: usize) -> f64 {
        self.epochs
            .get(idx + 1)
            .map(|e| e.start)
            .unwrap_or(f64::INFINITY)
    }
    pub fn size_at(&self, time: f64) -> f64 {
        let idx = self
            .epochs
            .iter()
            .rposition(|e| e.start <= time)
            .unwrap_or(0);
        self.epochs[idx].size_at(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn default_is_constant() {
        let demography = Demography::new(&[]).unwrap();
        assert_eq!(demography.epochs().len(), 1);
        assert_eq!(demography.size_at(0.0), 1.0);
        assert_eq!(demography.size_at(12.0), 1.0);
        assert_eq!(demography.next_start(0), f64::INFINITY);
    }
    #[test]
    fn exponential_is_continuous() {
        let models = vec![
            PopulationModel::Exponential {
                start_time: 0.0,
                alpha: 2.0,
            },
            PopulationModel::Exponential {
                start_time: 1.0,
                alpha: 0.0,
            },
        ];
        let demography = Demography::new(&models).unwrap();
        assert_eq!(demography.epochs().len(), 2);
        let shrunk = (-2f64).exp();
        assert!((demography.size_at(1.0) - shrunk).abs() < 1e-12);
        assert!((demography.size_at(5.0) - shrunk).abs() < 1e-12);
        assert!((demography.size_at(0.5) - (-1f64).exp()).abs() < 1e-12);
    }
    #[test]
    fn late_models_keep_the_default_epoch() {
        let models = vec![PopulationModel::Constant {
            start_time: 0.5,
            size: 4.0,
        }];
        let demography = Demography::new(&models).unwrap();
        assert_eq!(demography.epochs().len(), 2);
        assert_eq!(demography.size_at(0.1), 1.0);
        assert_eq!(demography.size_at(0.7), 4.0);
        assert_eq!(demography.next_start(0), 0.5);
    }
    #[test]
    fn invalid_models() {
        let zero = PopulationModel::Constant {
            start_time: 0.0,
            size: 0.0,
        };
        assert!(Demography::new(&[zero]).is_err());
        let unsorted = vec![
            PopulationModel::Constant {
                start_time: 2.0,
                size: 1.0,
            },
            PopulationModel::Constant {
                start_time: 1.0,
                size: 1.0,
            },
        ];
        assert!(Demography::new(&unsorted).is_err());
        let negative = PopulationModel::Exponential {
            start_time: -1.0,
            alpha: 1.0,
        };
        assert!(Demography::new(&[negative]).is_err());
        let nan = PopulationModel::Exponential {
            start_time: 0.0,
            alpha: f64::NAN,
        };
        assert!(Demography::new(&[nan]).is_err());
    }
    #[test]
    fn waiting_times() {
        let constant = Epoch {
            start: 0.0,
            initial_size: 2.0,
            alpha: 0.0,
        };
        assert!((constant.waiting_time(3.0, 4.0, 1.0) - 0.5).abs() < 1e-12);
        assert_eq!(constant.waiting_time(3.0, 0.0, 1.0), f64::INFINITY);
        let growing = Epoch {
            start: 0.0,
            initial_size: 1.0,
            alpha: 1.0,
        };
        let w = growing.waiting_time(0.0, 2.0, 1.0);
        // Integrated rate 2(e^w - 1) must match the unit draw.
        assert!((2.0 * (w.exp() - 1.0) - 1.0).abs() < 1e-12);
        assert!(w < 0.5);
        let declining = Epoch {
            start: 0.0,
            initial_size: 1.0,
            alpha: -1.0,
        };
        assert_eq!(declining.waiting_time(0.0, 1.0, 2.0), f64::INFINITY);
        assert!(declining.waiting_time(0.0, 1.0, 0.5).is_finite());
    }
}
