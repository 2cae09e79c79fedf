use super::evolver::ProgressCallback;
use serde::Serialize;

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        println!("Generation {} starting...", generation + 1);
    }

    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, population_size: usize) {
        println!(
            "Generation {} complete. Best fitness: {:.4}, population size: {}",
            generation + 1,
            best_fitness,
            population_size
        );
    }

    fn on_instance_evaluated(&mut self, instance_num: usize, total: usize) {
        if instance_num % 10 == 0 || instance_num == total {
            println!("  Evaluated {}/{} instances", instance_num, total);
        }
    }
}

/// Ignores every event. Used for nested evolutions.
pub struct NullProgressCallback;

impl ProgressCallback for NullProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}

    fn on_generation_complete(&mut self, _generation: usize, _best_fitness: f64, _population_size: usize) {}

    fn on_instance_evaluated(&mut self, _instance_num: usize, _total: usize) {}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best_fitness: f64,
    pub population_size: usize,
}

/// Keeps one record per completed generation and forwards every event to `inner`.
pub struct FitnessHistory<C: ProgressCallback> {
    inner: C,
    records: Vec<GenerationRecord>,
}

impl<C: ProgressCallback> FitnessHistory<C> {
    pub fn new(inner: C) -> Self {
        Self { inner, records: Vec::new() }
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<GenerationRecord> {
        self.records
    }
}

impl<C: ProgressCallback> ProgressCallback for FitnessHistory<C> {
    fn on_generation_start(&mut self, generation: usize) {
        self.inner.on_generation_start(generation);
    }

    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, population_size: usize) {
        self.records.push(GenerationRecord {
            generation,
            best_fitness,
            population_size,
        });
        self.inner
            .on_generation_complete(generation, best_fitness, population_size);
    }

    fn on_instance_evaluated(&mut self, instance_num: usize, total: usize) {
        self.inner.on_instance_evaluated(instance_num, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        started: usize,
        completed: usize,
        evaluated: usize,
    }

    impl ProgressCallback for Counting {
        fn on_generation_start(&mut self, _generation: usize) {
            self.started += 1;
        }

        fn on_generation_complete(&mut self, _generation: usize, _best_fitness: f64, _population_size: usize) {
            self.completed += 1;
        }

        fn on_instance_evaluated(&mut self, _instance_num: usize, _total: usize) {
            self.evaluated += 1;
        }
    }

    #[test]
    fn test_history_records_completed_generations() {
        let mut history = FitnessHistory::new(NullProgressCallback);
        history.on_generation_start(0);
        history.on_instance_evaluated(1, 10);
        history.on_generation_complete(0, 2.5, 10);
        history.on_generation_start(1);
        history.on_generation_complete(1, 3.0, 10);

        assert_eq!(
            history.records(),
            &[
                GenerationRecord { generation: 0, best_fitness: 2.5, population_size: 10 },
                GenerationRecord { generation: 1, best_fitness: 3.0, population_size: 10 },
            ]
        );
    }

    #[test]
    fn test_history_forwards_to_inner() {
        let mut history = FitnessHistory::new(Counting::default());
        history.on_generation_start(0);
        history.on_instance_evaluated(1, 2);
        history.on_instance_evaluated(2, 2);
        history.on_generation_complete(0, 1.0, 2);

        assert_eq!(history.records().len(), 1);
        let inner = history.inner;
        assert_eq!((inner.started, inner.completed, inner.evaluated), (1, 1, 2));
    }

    #[test]
    fn test_history_serializes_records() {
        let mut history = FitnessHistory::new(NullProgressCallback);
        history.on_generation_complete(4, 1.5, 8);
        let json = serde_json::to_value(history.into_records()).unwrap();
        assert_eq!(json[0]["generation"], 4);
        assert_eq!(json[0]["population_size"], 8);
    }
}
