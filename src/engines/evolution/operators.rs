use super::instance::GeneticInstance;
use crate::engines::grammar::ParametricString;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

/// One-point crossover of two strings at a split in `0..=min(len)`.
pub fn switch_strings<R: Rng>(
    first: &ParametricString,
    second: &ParametricString,
    rng: &mut R,
) -> (ParametricString, ParametricString) {
    let point = rng.gen_range(0..=first.len().min(second.len()));
    let (head1, tail1) = first.modules().split_at(point);
    let (head2, tail2) = second.modules().split_at(point);

    let child1: Vec<_> = head1.iter().chain(tail2.iter()).cloned().collect();
    let child2: Vec<_> = head2.iter().chain(tail1.iter()).cloned().collect();
    (child1.into(), child2.into())
}

/// Sort best first. Unevaluated instances rank as zero.
pub fn sort_population(population: &mut [GeneticInstance]) {
    population.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));
}

/// Roulette wheel selection with replacement: probability proportional to fitness.
pub fn roulette_selection<R: Rng>(
    population: &[GeneticInstance],
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    if population.is_empty() {
        return Vec::new();
    }
    let total: f64 = population.iter().map(|i| i.score().max(0.0)).sum();

    (0..count)
        .map(|_| {
            if total <= 0.0 {
                // Nothing to weigh by, pick uniformly
                return rng.gen_range(0..population.len());
            }
            let choice = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            for (i, instance) in population.iter().enumerate() {
                cumulative += instance.score().max(0.0);
                if choice < cumulative {
                    return i;
                }
            }
            population.len() - 1
        })
        .collect()
}

/// The `count` fittest instances, ties shuffled.
pub fn best_selection<R: Rng>(
    population: &[GeneticInstance],
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.shuffle(rng);
    // stable sort keeps the shuffled order among equal fitness
    order.sort_by(|a, b| {
        population[*b]
            .score()
            .partial_cmp(&population[*a].score())
            .unwrap_or(Ordering::Equal)
    });
    order.truncate(count);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::grammar::LSystem;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn instance(fitness: f64) -> GeneticInstance {
        let mut i = GeneticInstance::new(LSystem::default());
        i.fitness = Some(fitness);
        i
    }

    #[test]
    fn test_switch_strings_keeps_all_modules() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = ParametricString::parse("FFFF").unwrap();
        let b = ParametricString::parse("LL").unwrap();
        for _ in 0..20 {
            let (x, y) = switch_strings(&a, &b, &mut rng);
            assert_eq!(x.len() + y.len(), 6);
            assert_eq!(x.count_letter('F') + y.count_letter('F'), 4);
        }
    }

    #[test]
    fn test_roulette_never_picks_zero_fitness() {
        let mut rng = StdRng::seed_from_u64(2);
        let population = vec![instance(0.0), instance(3.0), instance(0.0)];
        let picks = roulette_selection(&population, 50, &mut rng);
        assert!(picks.iter().all(|i| *i == 1));
    }

    #[test]
    fn test_roulette_with_no_fitness_is_uniform() {
        let mut rng = StdRng::seed_from_u64(3);
        let population = vec![instance(0.0), instance(0.0)];
        let picks = roulette_selection(&population, 100, &mut rng);
        assert!(picks.contains(&0) && picks.contains(&1));
    }

    #[test]
    fn test_best_selection() {
        let mut rng = StdRng::seed_from_u64(4);
        let population = vec![instance(1.0), instance(5.0), instance(2.0), instance(5.0)];
        let picks = best_selection(&population, 3, &mut rng);
        assert_eq!(picks.len(), 3);
        let mut top: Vec<usize> = picks[..2].to_vec();
        top.sort();
        assert_eq!(top, vec![1, 3]);
        assert_eq!(picks[2], 2);
    }

    #[test]
    fn test_sort_population() {
        let mut population = vec![instance(1.0), GeneticInstance::new(LSystem::default()), instance(4.0)];
        sort_population(&mut population);
        assert_eq!(population[0].fitness, Some(4.0));
        assert_eq!(population[2].fitness, None);
    }
}
