// Kept in its own test binary: the seed functions write process-wide
// environment variables.

use model_helpers::{fix_seed, fix_seed_alternate_framework, fix_seed_with, RandomnessConfig};
use std::env;

#[test]
fn test_environment_variables_are_exported() {
    fix_seed(4321);
    assert_eq!(env::var("PYTHONHASHSEED").unwrap(), "4321");

    let quiet = RandomnessConfig::builder().seed(1).set_env_vars(false).build();
    fix_seed_with(&quiet).unwrap();
    assert_eq!(env::var("PYTHONHASHSEED").unwrap(), "4321");

    fix_seed_alternate_framework(55);
    assert_eq!(env::var("PYTHONHASHSEED").unwrap(), "55");
    assert_eq!(env::var("TF_DETERMINISTIC_OPS").unwrap(), "55");
}
