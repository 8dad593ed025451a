use efrgen::config::ModelConfig;
use efrgen::data::Dataset;
use efrgen::engines::generation::{query, Forest, ForestContext, Individual};
use efrgen::engines::model::{fuzzy_threshold, Opcode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn create_test_context(config: ModelConfig) -> Arc<ForestContext> {
    let rows: Vec<Vec<f64>> = (0..10)
        .map(|r| {
            let x = r as f64 / 10.0;
            vec![x, (1.0 - x) * 0.8, (x * 7.0).fract(), if r % 3 == 0 { 1.0 } else { 0.0 }]
        })
        .collect();
    ForestContext::fuzzy(Dataset::from_rows(&rows, 1).unwrap(), config)
}

#[test]
fn test_two_decimal_query_round_trip() {
    let ctx = create_test_context(ModelConfig::default());
    let text = "t0:0.30 t1:0.60 and:0.50 ;";
    let forest = Forest::parse(ctx, text);

    assert_eq!(forest.len(), 4);
    assert_eq!(forest.instructions()[2].opcode, Opcode::And);
    assert_eq!(format!("{:.2}", forest), text);
}

#[test]
fn test_unknown_tokens_do_not_stop_parsing() {
    let ctx = create_test_context(ModelConfig::default());
    let forest = Forest::parse(ctx, "t0:0.3 bogus:0.4 t1:0.6 or:0.5 ;");

    assert_eq!(forest.len(), 5);
    assert!(forest.instructions()[1].is_noop());
    assert_eq!(forest.instructions()[3].opcode, Opcode::Or);
    assert!(forest.validate().is_ok());
}

#[test]
fn test_query_evaluates_estimates() {
    let ctx = create_test_context(ModelConfig::default());
    let forest = query(Arc::clone(&ctx), "t0:0.5 not:0.5 ;").unwrap();

    assert!(forest.is_evaluated());
    for (row, estimate) in forest.estimates().iter().enumerate() {
        let x = ctx.dataset.row(row)[0];
        let expected = fuzzy_threshold(1.0 - fuzzy_threshold(x, 0.5), 0.5);
        assert!((estimate - expected).abs() < 1e-12);
    }
}

#[test]
fn test_query_rejects_malformed_forest() {
    let ctx = create_test_context(ModelConfig::default());
    assert!(query(Arc::clone(&ctx), "t0:0.5 t1:0.5 ;").is_err());
    assert!(query(ctx, "and:0.5 ;").is_err());
}

#[test]
fn test_printed_forests_execute_identically() {
    let ctx = create_test_context(ModelConfig {
        past_input_limit: 3,
        past_output_limit: 3,
        ..ModelConfig::default()
    });
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..300 {
        let mut original = Forest::random(Arc::clone(&ctx), &mut rng);
        original.mutate(0.2, &mut rng);
        let mut reparsed = Forest::parse(Arc::clone(&ctx), &original.to_string());

        let fitness = original.compute_fitness().unwrap();
        assert_eq!(reparsed.compute_fitness().unwrap(), fitness);
        assert_eq!(reparsed.estimates(), original.estimates());
    }
}

#[test]
fn test_dot_export_of_query() {
    let ctx = create_test_context(ModelConfig::default());
    let forest = Forest::parse(ctx, "t0:0.3 t1:0.6 and:0.5 ;");
    let dot = forest.dot();

    assert!(dot.starts_with("digraph query {"));
    assert!(dot.contains("2 -> 1;"));
    assert!(dot.contains("2 -> 0;"));
}
