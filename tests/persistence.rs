//! Model persistence and link-repair tests.
//!
//! Models are written with `-f` when a learner closes and read back with
//! `-i`. These tests cover the train → close → reopen cycle and the
//! duplicate-link recovery that only shows up when reloading a model.

use std::path::Path;

use vw_bridge::{Learner, ReferenceEngine};

const HOUSE_DATA: [&str; 3] = [
    "0 | price:.23 sqft:.25 age:.05 2006",
    "1 2 'second_house | price:.18 sqft:.15 age:.35 1976",
    "0 1 0.5 'third_house | price:.53 sqft:.32 age:.87 1924",
];

const HELD_OUT: &str = "| price:0.23 sqft:0.25 age:0.05 2006";

fn train_house_model(model: &Path) {
    let mut learner = Learner::open(ReferenceEngine, &format!(" --quiet -f {}", model.display())).unwrap();
    for sample in HOUSE_DATA {
        learner.learn(sample).unwrap();
    }
    learner.close();
}

/// Held-out prediction after one pass over `HOUSE_DATA` at the default rate.
const HOUSE_GOLDEN: f32 = -0.116_557_4;

/// `"| "` after 100 rounds of `-1` / `1` with logistic loss and link.
const BALANCED_GOLDEN: f32 = 0.533_280_8;

fn logistic_args(with_link: bool) -> String {
    format!(
        "--quiet --loss_function logistic {}",
        if with_link { "--link logistic " } else { "" }
    )
}

#[test]
fn trained_model_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("house.model");
    train_house_model(&model);
    assert!(model.exists());

    let mut scorer = Learner::open(ReferenceEngine, &format!("--quiet -t -i {}", model.display())).unwrap();
    let p1 = scorer.predict(HELD_OUT).unwrap();
    let p2 = scorer.predict(HELD_OUT).unwrap();
    assert!((p1 - HOUSE_GOLDEN).abs() < 1e-4, "got {p1}");
    assert_eq!(p1, p2);
    scorer.close();
}

#[test]
fn test_only_scorer_ignores_labels() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("house.model");
    train_house_model(&model);

    let mut scorer = Learner::open(ReferenceEngine, &format!("--quiet -t -i {}", model.display())).unwrap();
    let before = scorer.predict(HELD_OUT).unwrap();
    scorer.learn(&format!("100 {HELD_OUT}")).unwrap();
    assert_eq!(scorer.predict(HELD_OUT).unwrap(), before);
}

#[test]
fn many_samples_logistic_model() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("basic.model");

    let mut m = Learner::open(
        ReferenceEngine,
        &format!("{}-f {}", logistic_args(true), model.display()),
    )
    .unwrap();
    for _ in 0..100 {
        m.learn("-1 | ").unwrap();
        m.learn("1 | ").unwrap();
    }
    m.close();

    let mut m = Learner::open(ReferenceEngine, &format!("--quiet -i {}", model.display())).unwrap();
    let p = m.predict("| ").unwrap();
    assert!((p - BALANCED_GOLDEN).abs() < 1e-4, "got {p}");
}

#[test]
fn link_function_recovery() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("logistic.model");

    let mut trainer = Learner::open(
        ReferenceEngine,
        &format!("{}-f {}", logistic_args(true), model.display()),
    )
    .unwrap();
    for _ in 0..100 {
        trainer.learn("-1 | ").unwrap();
        trainer.learn("1 | ").unwrap();
    }
    trainer.close();

    let without_link = Learner::open(
        ReferenceEngine,
        &format!("{} -i {}", logistic_args(false), model.display()),
    )
    .unwrap()
    .predict("")
    .unwrap();

    // Would fail with the duplicate-link error without the repair.
    let with_link = Learner::open(
        ReferenceEngine,
        &format!("{} -i {}", logistic_args(true), model.display()),
    )
    .unwrap()
    .predict("")
    .unwrap();

    assert!((without_link - with_link).abs() < 1e-6);
    assert!((with_link - BALANCED_GOLDEN).abs() < 1e-4, "got {with_link}");
}

#[test]
fn corrupt_model_is_an_error_not_a_crash() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("vw_bad.model");
    std::fs::write(&model, b"\x00\x01garbage").unwrap();

    let err = Learner::open(ReferenceEngine, &format!("--quiet -i {}", model.display())).unwrap_err();
    assert!(err.native_message().unwrap().starts_with("bad model format"));
}
