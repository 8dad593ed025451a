use efrgen::config::ModelConfig;
use efrgen::data::Dataset;
use efrgen::engines::generation::{subtree_left, Forest, ForestContext, Individual};
use efrgen::engines::model::{is_well_formed, residual_depth, Instruction, Opcode};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Four inputs, two targets
fn create_test_context(config: ModelConfig) -> Arc<ForestContext> {
    let rows: Vec<Vec<f64>> = (0..12)
        .map(|r| {
            let x = r as f64 / 12.0;
            vec![x, 1.0 - x, (x * 3.0).fract(), 0.5, if x > 0.5 { 1.0 } else { 0.0 }, x]
        })
        .collect();
    let dataset = Dataset::from_rows(&rows, 2).unwrap();
    ForestContext::fuzzy(dataset, config)
}

fn lagged_config() -> ModelConfig {
    ModelConfig {
        past_input_limit: 3,
        past_output_limit: 2,
        ..ModelConfig::default()
    }
}

#[test]
fn test_mutation_and_crossover_preserve_well_formedness() {
    let ctx = create_test_context(lagged_config());
    let mut rng = StdRng::seed_from_u64(42);

    for trial in 0..1500 {
        let mut son = Forest::random(Arc::clone(&ctx), &mut rng);
        let mut daughter = Forest::random(Arc::clone(&ctx), &mut rng);

        son.crossover(&mut daughter, 1.0, &mut rng);
        son.mutate(0.3, &mut rng);
        daughter.mutate(0.3, &mut rng);

        assert!(son.validate().is_ok(), "trial {}: {}", trial, son);
        assert!(daughter.validate().is_ok(), "trial {}: {}", trial, daughter);
        assert_eq!(son.outputs(), 2);
        assert_eq!(daughter.outputs(), 2);
    }
}

#[test]
fn test_repeated_generations_stay_well_formed() {
    let ctx = create_test_context(ModelConfig::default());
    let mut rng = StdRng::seed_from_u64(7);
    let mut a = Forest::random(Arc::clone(&ctx), &mut rng);
    let mut b = Forest::random(Arc::clone(&ctx), &mut rng);

    for _ in 0..1000 {
        a.crossover(&mut b, 0.8, &mut rng);
        a.mutate(0.1, &mut rng);
        b.mutate(0.1, &mut rng);
        assert!(a.validate().is_ok(), "{}", a);
        assert!(b.validate().is_ok(), "{}", b);
        assert!(a.compute_fitness().is_ok());
        assert!(b.compute_fitness().is_ok());
        if a.len() > 400 {
            a.compact();
        }
        if b.len() > 400 {
            b.compact();
        }
    }
}

#[test]
fn test_nontrivial_crossover_keeps_offspring_long_enough() {
    let ctx = create_test_context(ModelConfig {
        nontrivial: true,
        ..ModelConfig::default()
    });
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..1000 {
        let mut a = Forest::random(Arc::clone(&ctx), &mut rng);
        let mut b = Forest::random(Arc::clone(&ctx), &mut rng);
        let (before_a, before_b) = (a.to_string(), b.to_string());

        a.crossover(&mut b, 1.0, &mut rng);

        let unchanged = a.to_string() == before_a && b.to_string() == before_b;
        assert!(unchanged || (a.len() >= 3 && b.len() >= 3));
        assert!(a.validate().is_ok());
        assert!(b.validate().is_ok());
    }
}

#[test]
fn test_nontrivial_mutation_never_collapses_a_tree() {
    let ctx = create_test_context(ModelConfig {
        nontrivial: true,
        allow_not: true,
        ..ModelConfig::default()
    });
    let mut rng = StdRng::seed_from_u64(19);

    for _ in 0..300 {
        let mut forest = Forest::parse(Arc::clone(&ctx), "t0:0.5 not:0.5 ; t1:0.5 not:0.5 ;");
        forest.mutate(1.0, &mut rng);
        assert!(forest.validate().is_ok(), "{}", forest);
        for range in forest.trees() {
            let live = forest.instructions()[range].iter().filter(|i| i.is_live()).count();
            assert!(live >= 2, "{}", forest);
        }
    }
}

#[test]
fn test_single_terminal_always_changes_under_mutation() {
    let ctx = create_test_context(ModelConfig::default());
    let mut rng = StdRng::seed_from_u64(100);

    for _ in 0..100 {
        let mut forest = Forest::parse(Arc::clone(&ctx), "t0:0.30 ; t1:0.30 ;");
        let before = forest.to_string();
        forest.mutate(1.0, &mut rng);
        assert_ne!(forest.to_string(), before);
        assert!(forest.validate().is_ok());
    }
}

/// `t0 t1 all ; t2 ;` with the aggregate closing the first tree
fn aggregate_forest(ctx: Arc<ForestContext>) -> Forest {
    let instructions = vec![
        Instruction::input(0, 0.1),
        Instruction::input(1, 0.2),
        Instruction::new(Opcode::ProcessAll, 0.3),
        Instruction::separator(),
        Instruction::input(2, 0.4),
        Instruction::separator(),
    ];
    Forest::from_instructions(ctx, instructions)
}

#[test]
fn test_process_all_swaps_whole_tree() {
    let ctx = create_test_context(ModelConfig::default());
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..200 {
        let mut a = aggregate_forest(Arc::clone(&ctx));
        let mut b = Forest::parse(Arc::clone(&ctx), "t3:0.5 ; t0:0.6 t1:0.7 or:0.8 ;");
        a.crossover(&mut b, 1.0, &mut rng);

        for forest in [&a, &b] {
            for range in forest.trees() {
                assert_eq!(residual_depth(&forest.instructions()[range]), Some(1), "{}", forest);
            }
        }
    }
}

#[test]
fn test_mutation_keeps_process_all_trees_well_formed() {
    let ctx = create_test_context(ModelConfig {
        allow_not: true,
        ..ModelConfig::default()
    });

    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut forest = aggregate_forest(Arc::clone(&ctx));
        forest.mutate(1.0, &mut rng);
        assert!(forest.validate().is_ok(), "seed {}: {}", seed, forest);
    }
}

#[test]
fn test_nontrivial_crossover_ignores_noops_when_guarding() {
    let ctx = create_test_context(ModelConfig {
        nontrivial: true,
        ..ModelConfig::default()
    });

    for seed in 0..500 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut a = Forest::parse(Arc::clone(&ctx), "t0:0.1 t1:0.2 and:0.3 x ; t2:0.1 t3:0.2 or:0.3 ;");
        let mut b = Forest::parse(Arc::clone(&ctx), "t2:0.4 t3:0.5 or:0.6 ; t0:0.4 x t1:0.5 and:0.6 ;");
        a.crossover(&mut b, 1.0, &mut rng);

        for forest in [&a, &b] {
            assert!(forest.validate().is_ok(), "seed {}: {}", seed, forest);
            for range in forest.trees() {
                let live = forest.instructions()[range].iter().filter(|i| i.is_live()).count();
                assert!(live >= 2, "seed {}: {}", seed, forest);
            }
        }
    }
}

#[test]
fn test_crossover_drops_noops_from_offspring() {
    let ctx = create_test_context(ModelConfig::default());
    let mut rng = StdRng::seed_from_u64(12);
    let mut a = Forest::parse(Arc::clone(&ctx), "t0:0.1 x t1:0.2 and:0.3 x ; t2:0.4 ;");
    let mut b = Forest::parse(ctx, "t3:0.5 not:0.6 x ; t0:0.7 ;");

    a.crossover(&mut b, 1.0, &mut rng);
    for forest in [&a, &b] {
        assert!(!forest.instructions().iter().any(|i| i.is_noop()), "{}", forest);
        assert!(forest.validate().is_ok());
    }
}

#[test]
fn test_crossover_with_zero_probability_copies_parents() {
    let ctx = create_test_context(ModelConfig::default());
    let mut rng = StdRng::seed_from_u64(8);
    let mut a = Forest::parse(Arc::clone(&ctx), "t0:0.1 x t1:0.2 and:0.3 ; t2:0.4 ;");
    let mut b = Forest::parse(ctx, "t3:0.5 ; t0:0.6 not:0.7 ;");

    a.crossover(&mut b, 0.0, &mut rng);
    // trees are copied whole, without their no-ops
    assert_eq!(a.to_string(), "t0:0.1 t1:0.2 and:0.3 ; t2:0.4 ;");
    assert_eq!(b.to_string(), "t3:0.5 ; t0:0.6 not:0.7 ;");
}

/// Random forest roughened by a few mutation passes so no-ops appear
fn roughened_forest(seed: u64) -> Forest {
    let ctx = create_test_context(lagged_config());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut forest = Forest::random(ctx, &mut rng);
    for _ in 0..rng.gen_range(0..4) {
        forest.mutate(0.2, &mut rng);
    }
    forest
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn subtree_left_spans_well_formed_subtree(rng_seed in any::<u64>()) {
        let forest = roughened_forest(rng_seed);
        let instructions = forest.instructions();

        for range in forest.trees() {
            for i in range {
                let instruction = instructions[i];
                if instruction.is_noop() {
                    continue;
                }
                let from = subtree_left(instructions, i, instruction.arity());
                prop_assert!(from <= i);
                if instruction.arity() > 0 {
                    prop_assert!(from < i);
                }
                prop_assert!(is_well_formed(&instructions[from..=i]));
            }
        }
    }

    #[test]
    fn print_then_parse_preserves_instructions(rng_seed in any::<u64>()) {
        let forest = roughened_forest(rng_seed);
        let reparsed = Forest::parse(Arc::clone(forest.context()), &forest.to_string());
        prop_assert_eq!(reparsed.instructions(), forest.instructions());
    }
}
