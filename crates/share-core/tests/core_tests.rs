use share_core::{
    ConfigSources, Decision, Location, PathMapper, SharedRoot, SyncConfig, decide, find_override,
    resolve_config, resolve_roots,
};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

struct Env {
    _temp: TempDir,
    home: PathBuf,
    config_dir: PathBuf,
    work: PathBuf,
}

fn env() -> Env {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    let home = base.join("home");
    let config_dir = base.join("config");
    let work = home.join("work");
    fs::create_dir_all(&work).unwrap();
    fs::create_dir_all(config_dir.join("share")).unwrap();
    Env {
        _temp: temp,
        home,
        config_dir,
        work,
    }
}

impl Env {
    fn sources(&self) -> ConfigSources {
        ConfigSources::new(Some(self.home.clone()), Some(self.config_dir.clone()))
    }
}

#[test]
fn test_dotfiles_set_both_roots() {
    let env = env();
    fs::write(env.home.join(".sharepath"), "~/work\n").unwrap();
    fs::write(env.home.join(".shareroot"), "/mnt/shared\n").unwrap();

    let roots = resolve_roots(&env.work, &env.sources()).unwrap();
    assert_eq!(roots.local_root, Some(env.work.clone()));
    assert_eq!(roots.shared_root, SharedRoot::Local(PathBuf::from("/mnt/shared")));
}

#[test]
fn test_empty_dotfile_keeps_default() {
    let env = env();
    fs::write(env.home.join(".sharepath"), "   \n").unwrap();

    let roots = resolve_roots(&env.work, &env.sources()).unwrap();
    assert!(roots.local_root.is_none());
    assert_eq!(roots.shared_root, SharedRoot::Local(env.home.join("Shared/dump")));
}

#[test]
fn test_config_file_below_dotfiles() {
    let env = env();
    fs::write(
        env.config_dir.join("share/config.toml"),
        "shared_root = \"/from/config\"\ntolerance_secs = 2.5\nremote_shell = \"myssh\"\n",
    )
    .unwrap();
    fs::write(env.home.join(".shareroot"), "/from/dotfile").unwrap();

    let config = resolve_config(&env.work, &env.sources()).unwrap();
    assert_eq!(config.shared_root, SharedRoot::Local(PathBuf::from("/from/dotfile")));
    assert_eq!(config.tolerance, Duration::from_millis(2500));
    assert_eq!(config.remote_shell, "myssh");
}

#[test]
fn test_override_wins_and_is_relative_to_its_directory() {
    let env = env();
    fs::write(env.home.join(".sharepath"), "/somewhere/else").unwrap();
    let project = env.work.join("project");
    let nested = project.join("src/deep");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        project.join(".shareoverride"),
        "local_root = \".\"\nshared_root = \"me@nas:/srv/project\"\n",
    )
    .unwrap();

    assert_eq!(find_override(&nested), Some(project.join(".shareoverride")));

    let roots = resolve_roots(&nested, &env.sources()).unwrap();
    assert_eq!(roots.local_root, Some(project.clone()));
    assert!(roots.shared_root.is_remote());
    assert_eq!(roots.shared_root.to_string(), "me@nas:/srv/project");
}

#[test]
fn test_override_can_clear_local_root() {
    let env = env();
    fs::write(env.home.join(".sharepath"), "~/work").unwrap();
    fs::write(env.work.join(".shareoverride"), "local_root = \"\"\n").unwrap();

    let roots = resolve_roots(&env.work, &env.sources()).unwrap();
    assert!(roots.local_root.is_none());
}

#[test]
fn test_malformed_override_is_an_error() {
    let env = env();
    fs::write(env.work.join(".shareoverride"), "local_root = [1, 2]\n").unwrap();
    assert!(resolve_roots(&env.work, &env.sources()).is_err());
}

#[test]
fn test_mapper_with_resolved_config() {
    let env = env();
    fs::write(env.home.join(".sharepath"), "~/work").unwrap();
    fs::write(env.home.join(".shareroot"), "u@h:/dump").unwrap();

    let config = resolve_config(&env.work, &env.sources()).unwrap();
    let mapper = PathMapper::new(&config, &env.work);
    let shared = mapper.to_shared(&env.work.join("notes/today.md")).unwrap();
    assert_eq!(shared.to_string(), "u@h:/dump/notes/today.md");
    assert!(matches!(shared, Location::Remote(_)));
}

#[test]
fn test_shared_root_string_conversion() {
    let config = SyncConfig::new(None, SharedRoot::parse("u@h:/dump").unwrap());
    let text = String::from(config.shared_root.clone());
    assert_eq!(text, "u@h:/dump");
    assert_eq!(SharedRoot::try_from(text).unwrap(), config.shared_root);
}

#[test]
fn test_decide_symmetry() {
    let base = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let tol = Duration::from_secs(1);
    for secs in [2u64, 3, 10, 3600] {
        let later = base + Duration::from_secs(secs);
        assert_eq!(decide(Some(later), Some(base), tol), Decision::PushNewer);
        assert_eq!(decide(Some(base), Some(later), tol), Decision::PullNewer);
    }
}
