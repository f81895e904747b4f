use model_helpers::cli::build_app;
use model_helpers::commands::{self, inspect::describe_record};
use model_helpers::config_file::HelperConfigFile;
use model_helpers::{fix_seed, load_weights, save_ckpt, Module, Sequential, Sgd};
use tempfile::TempDir;

fn checkpoint_in(dir: &TempDir) -> (std::path::PathBuf, Sequential) {
    let path = dir.path().join("run.ckpt");
    let model = Sequential::mlp(&[2, 3, 1], &mut fix_seed(6).framework);
    let optimizer = Sgd::new(&model.parameters(), 0.125, 0.0);
    save_ckpt(&model, &optimizer, &path).unwrap();
    (path, model)
}

#[test]
fn test_describe_checkpoint() {
    let dir = TempDir::new().unwrap();
    let (path, _) = checkpoint_in(&dir);
    let lines = describe_record(&std::fs::read(&path).unwrap()).unwrap();

    assert_eq!(lines[0], "Binary checkpoint");
    assert!(lines.iter().any(|l| l.contains("0.weight [3, 2] on cpu")));
    assert!(lines.iter().any(|l| l.contains("learning_rate: 0.125")));
}

#[test]
fn test_extract_weights_command() {
    let dir = TempDir::new().unwrap();
    let (path, model) = checkpoint_in(&dir);
    let output = dir.path().join("run.weights");

    let matches = build_app()
        .get_matches_from_safe(vec![
            "model-helpers",
            "extract-weights",
            path.to_str().unwrap(),
            output.to_str().unwrap(),
        ])
        .unwrap();
    commands::extract_weights(matches.subcommand_matches("extract-weights").unwrap()).unwrap();

    let mut restored = Sequential::mlp(&[2, 3, 1], &mut fix_seed(7).framework);
    load_weights(&mut restored, &output).unwrap();
    assert_eq!(restored.state_dict(), model.state_dict());

    let lines = describe_record(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(lines[0], "Binary weights file");
}

#[test]
fn test_generate_config_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("helpers.toml");
    let args = vec!["model-helpers", "generate-config", output.to_str().unwrap()];

    let matches = build_app().get_matches_from_safe(args.clone()).unwrap();
    commands::generate_config(matches.subcommand_matches("generate-config").unwrap()).unwrap();
    assert_eq!(HelperConfigFile::from_file(&output).unwrap().seed.seed, 1234);

    let matches = build_app().get_matches_from_safe(args).unwrap();
    assert!(commands::generate_config(matches.subcommand_matches("generate-config").unwrap()).is_err());
}
