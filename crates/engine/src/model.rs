//! The canonical weight vector, shared between the batch and SGD
//! optimizers. Weights are stored as bit-cast `f64`s behind `AtomicU64`
//! so SGD can update them lock-free while the batch optimizer, which
//! owns the model exclusively during its own pass, can use plain
//! relaxed loads/stores without contention.

use lre_concurrency::Renumbering;
use lre_core::J;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// The trained weight vector plus the per-J creation round used by SGD's
/// `NEW_FEATURES` training mode.
#[derive(Debug, Default)]
pub struct Model {
    weights: Vec<AtomicU64>,
    creation_time: Vec<AtomicU32>,
    current_creation_time: AtomicU32,
}

fn to_bits(w: f64) -> u64 {
    w.to_bits()
}

fn from_bits(bits: u64) -> f64 {
    f64::from_bits(bits)
}

impl Model {
    /// A zero-weight model sized for `j_size` J's, all stamped with
    /// creation round 0.
    pub fn new(j_size: u32) -> Self {
        Self {
            weights: (0..j_size).map(|_| AtomicU64::new(to_bits(0.0))).collect(),
            creation_time: (0..j_size).map(|_| AtomicU32::new(0)).collect(),
            current_creation_time: AtomicU32::new(0),
        }
    }

    /// Number of J's this model has weights for.
    pub fn len(&self) -> u32 {
        self.weights.len() as u32
    }

    /// `true` if this model has no J's.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Grow to `new_size`, stamping every newly added J with the current
    /// creation round and advancing that round (exploration adds a batch
    /// of features per round; SGD's `NEW_FEATURES` mode targets exactly
    /// the most recent round).
    pub fn grow(&mut self, new_size: u32) {
        if new_size as usize <= self.weights.len() {
            return;
        }
        let round = self.current_creation_time.load(Ordering::Relaxed) + 1;
        while self.weights.len() < new_size as usize {
            self.weights.push(AtomicU64::new(to_bits(0.0)));
            self.creation_time.push(AtomicU32::new(round));
        }
        self.current_creation_time.store(round, Ordering::Relaxed);
    }

    /// Current weight for J.
    pub fn get(&self, j: J) -> f64 {
        from_bits(self.weights[j as usize].load(Ordering::Relaxed))
    }

    /// Overwrite the weight for J.
    pub fn set(&self, j: J, value: f64) {
        self.weights[j as usize].store(to_bits(value), Ordering::Relaxed);
    }

    /// Atomically add `delta` to the weight for J via a compare-exchange
    /// loop (Hogwild-style).
    pub fn atomic_add(&self, j: J, delta: f64) {
        let cell = &self.weights[j as usize];
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let new_value = from_bits(current) + delta;
            match cell.compare_exchange_weak(
                current,
                to_bits(new_value),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Creation round for J (0 for features present from the first load).
    pub fn creation_time(&self, j: J) -> u32 {
        self.creation_time[j as usize].load(Ordering::Relaxed)
    }

    /// The most recent creation round stamped by [`Model::grow`].
    pub fn current_creation_time(&self) -> u32 {
        self.current_creation_time.load(Ordering::Relaxed)
    }

    /// Count of J's with a non-zero weight.
    pub fn nonzero_count(&self) -> usize {
        (0..self.weights.len()).filter(|&j| self.get(j as J) != 0.0).count()
    }

    /// Sum of absolute weights.
    pub fn l1_norm(&self) -> f64 {
        (0..self.weights.len()).map(|j| self.get(j as J).abs()).sum()
    }

    /// Sum of squared weights.
    pub fn l2_norm(&self) -> f64 {
        (0..self.weights.len()).map(|j| self.get(j as J).powi(2)).sum()
    }

    /// Apply a renumbering: compact weights and creation times, dropping
    /// removed J's.
    pub fn remove_and_renumber(&mut self, renumbering: &Renumbering) {
        let mut new_weights = vec![AtomicU64::new(to_bits(0.0)); renumbering.new_size() as usize];
        let mut new_creation = vec![AtomicU32::new(0); renumbering.new_size() as usize];
        for (old_j, new_j) in renumbering.survivors() {
            if (old_j as usize) < self.weights.len() {
                new_weights[new_j as usize] = AtomicU64::new(self.weights[old_j as usize].load(Ordering::Relaxed));
                new_creation[new_j as usize] =
                    AtomicU32::new(self.creation_time[old_j as usize].load(Ordering::Relaxed));
            }
        }
        self.weights = new_weights;
        self.creation_time = new_creation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_add_accumulates_across_threads() {
        let model = std::sync::Arc::new(Model::new(1));
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let model = model.clone();
                scope.spawn(move || {
                    for _ in 0..1000 {
                        model.atomic_add(0, 1.0);
                    }
                });
            }
        });
        assert_eq!(model.get(0), 8000.0);
    }

    #[test]
    fn grow_stamps_new_js_with_advanced_round() {
        let mut model = Model::new(2);
        assert_eq!(model.creation_time(0), 0);
        model.grow(4);
        assert_eq!(model.current_creation_time(), 1);
        assert_eq!(model.creation_time(2), 1);
        assert_eq!(model.creation_time(0), 0);
    }

    #[test]
    fn remove_and_renumber_compacts_weights() {
        let mut model = Model::new(3);
        model.set(0, 1.0);
        model.set(1, 2.0);
        model.set(2, 3.0);
        let renumbering = Renumbering::from_removed(3, &[false, true, false]).unwrap();
        model.remove_and_renumber(&renumbering);
        assert_eq!(model.len(), 2);
        assert_eq!(model.get(0), 1.0);
        assert_eq!(model.get(1), 3.0);
    }
}
