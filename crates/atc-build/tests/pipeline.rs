//! Pipeline tests against a scripted toolchain.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use atc_build::{
    AssemblyLayout, BridgeTarget, BuildError, BuildSettings, DevServerBridge, OutputAssembler,
    PipelineError, ProfileName, ReleaseBuilder, WebPipeline,
};
use atc_common::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

/// Freshly compiled module bytes, distinct from anything left by earlier builds.
const FRESH_MODULE: &[u8] = b"\0asm fresh";

/// Stands in for `cargo` and `wasm-bindgen`, writing the files they would.
struct FakeToolchain {
    /// Module path below the target directory.
    module_in_target: PathBuf,
    /// Where cargo writes without `--target-dir`, as with `CARGO_TARGET_DIR` set.
    env_target_dir: PathBuf,
    compile_fails: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeToolchain {
    fn new(settings: &BuildSettings) -> Self {
        let module = settings.compiled_module(&ProfileName::Release.profile());
        Self {
            module_in_target: module.strip_prefix(settings.target_dir()).unwrap().to_path_buf(),
            env_target_dir: settings.project_root.join("env-target"),
            compile_fails: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn programs(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

fn arg_after<'a>(spec: &'a CommandSpec, flag: &str) -> &'a Path {
    let index = spec.args.iter().position(|arg| arg == flag).unwrap();
    Path::new(&spec.args[index + 1])
}

impl CommandRunner for FakeToolchain {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let program = spec.program_name();
        self.calls.borrow_mut().push(program.clone());
        match program.as_str() {
            "cargo" if self.compile_fails => Ok(CommandOutput::failure(
                101,
                "error[E0425]: cannot find value `radar` in this scope",
            )),
            "cargo" => {
                let target_dir = if spec.has_arg("--target-dir") {
                    arg_after(spec, "--target-dir").to_path_buf()
                } else {
                    self.env_target_dir.clone()
                };
                let module = target_dir.join(&self.module_in_target);
                fs::create_dir_all(module.parent().unwrap()).unwrap();
                fs::write(&module, FRESH_MODULE).unwrap();
                Ok(CommandOutput::success())
            }
            "wasm-bindgen" => {
                let out_dir = arg_after(spec, "--out-dir");
                let name = arg_after(spec, "--out-name").to_str().unwrap();
                let module = Path::new(spec.args.last().unwrap());
                fs::write(out_dir.join(format!("{name}.js")), "export default init;").unwrap();
                fs::copy(module, out_dir.join(format!("{name}_bg.wasm"))).unwrap();
                Ok(CommandOutput::success())
            }
            other => panic!("unexpected tool {other}"),
        }
    }
}

struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join("assets/sound.ogg"), b"OggS").unwrap();
        fs::create_dir_all(root.join("public")).unwrap();
        fs::write(root.join("public/index.html"), "<html>atc</html>").unwrap();
        Self { _dir: dir, root }
    }

    fn settings(&self) -> BuildSettings {
        BuildSettings::new(&self.root)
    }

    fn layout(&self) -> AssemblyLayout {
        AssemblyLayout {
            out_dir: self.root.join("out"),
            assets_dir: self.root.join("assets"),
            public_dir: self.root.join("public"),
        }
    }

    fn bridge(&self) -> BridgeTarget {
        BridgeTarget {
            config_path: self.root.join("web/atc-bridge.json"),
            dest: "game".to_string(),
        }
    }

    fn pipeline<'a>(&self, toolchain: &'a FakeToolchain) -> WebPipeline<&'a FakeToolchain> {
        WebPipeline::new(
            ReleaseBuilder::new(toolchain, self.settings()),
            OutputAssembler::new(self.layout()),
            self.bridge(),
        )
    }
}

fn files_under(root: &Path) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap();
                files.insert(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    files
}

#[test]
fn test_end_to_end_default_profile() {
    let project = Project::new();
    let toolchain = FakeToolchain::new(&project.settings());

    let report = project
        .pipeline(&toolchain)
        .run(&ProfileName::default().profile(), true)
        .unwrap();

    assert_eq!(toolchain.programs(), vec!["cargo", "wasm-bindgen"]);
    assert_eq!(report.outputs.profile, ProfileName::Release);
    let expected: BTreeSet<String> = ["assets/sound.ogg", "atc_game.js", "atc_game_bg.wasm", "index.html"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(files_under(&project.root.join("out")), expected);
    assert_eq!(report.assembly.unwrap().file_count(), 2);

    let bridge: DevServerBridge = serde_json::from_str(
        &fs::read_to_string(project.root.join("web/atc-bridge.json")).unwrap(),
    )
    .unwrap();
    let assets = project.root.join("out/assets");
    assert_eq!(bridge.allow, vec![assets.to_string_lossy().to_string()]);
    assert_eq!(bridge.static_copy[0].dest, "game");
    assert!(bridge.static_copy[0].src.ends_with("out/assets/*"));
}

#[test]
fn test_compile_failure_never_runs_bindings() {
    let project = Project::new();
    let toolchain = FakeToolchain {
        compile_fails: true,
        ..FakeToolchain::new(&project.settings())
    };

    let err = project
        .pipeline(&toolchain)
        .run(&ProfileName::Release.profile(), true)
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Build(BuildError::Compile { code: Some(101), ref message, .. })
            if message.contains("E0425")
    ));
    assert_eq!(toolchain.programs(), vec!["cargo"]);
    assert!(!project.root.join("out").exists());
    assert!(!project.root.join("web/atc-bridge.json").exists());
}

#[test]
fn test_public_index_overwrites_previous_copy() {
    let project = Project::new();
    fs::create_dir_all(project.root.join("out")).unwrap();
    fs::write(project.root.join("out/index.html"), "<html>stale</html>").unwrap();
    fs::write(project.root.join("out/old.js"), "stale").unwrap();

    let report = OutputAssembler::new(project.layout()).assemble().unwrap();

    assert_eq!(
        fs::read_to_string(project.root.join("out/index.html")).unwrap(),
        "<html>atc</html>"
    );
    assert!(report.overwritten.contains(Path::new("index.html")));
    // Nothing is deleted.
    assert!(project.root.join("out/old.js").is_file());
}

#[test]
fn test_public_tree_wins_over_assets_on_collision() {
    let project = Project::new();
    let layout = AssemblyLayout {
        out_dir: project.root.join("out"),
        assets_dir: project.root.join("assets"),
        public_dir: project.root.join("public"),
    };
    fs::create_dir_all(project.root.join("public/assets")).unwrap();
    fs::write(project.root.join("public/assets/sound.ogg"), b"public").unwrap();

    let report = OutputAssembler::new(layout).assemble().unwrap();

    assert_eq!(
        fs::read(project.root.join("out/assets/sound.ogg")).unwrap(),
        b"public"
    );
    assert!(report.overwritten.contains(Path::new("assets/sound.ogg")));
}

#[test]
fn test_skip_assembly_builds_only() {
    let project = Project::new();
    let toolchain = FakeToolchain::new(&project.settings());

    let report = project
        .pipeline(&toolchain)
        .run(&ProfileName::Release.profile(), false)
        .unwrap();

    assert!(report.assembly.is_none());
    assert!(report.bridge.is_none());
    assert_eq!(
        files_under(&project.root.join("out")),
        ["atc_game.js", "atc_game_bg.wasm"].into_iter().map(String::from).collect()
    );
}

#[test]
fn test_stale_module_in_default_target_is_never_wrapped() {
    let project = Project::new();
    let settings = project.settings();
    let stale = settings.compiled_module(&ProfileName::Release.profile());
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, b"\0asm stale").unwrap();
    let toolchain = FakeToolchain::new(&settings);

    project
        .pipeline(&toolchain)
        .run(&ProfileName::Release.profile(), false)
        .unwrap();

    assert_eq!(
        fs::read(project.root.join("out/atc_game_bg.wasm")).unwrap(),
        FRESH_MODULE
    );
    assert!(!project.root.join("env-target").exists());
}

#[test]
fn test_missing_bindings_output_is_reported() {
    struct SilentBindgen(FakeToolchain);

    impl CommandRunner for SilentBindgen {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
            if spec.program_name() == "wasm-bindgen" {
                return Ok(CommandOutput::success());
            }
            self.0.run(spec)
        }
    }

    let project = Project::new();
    let runner = SilentBindgen(FakeToolchain::new(&project.settings()));
    let builder = ReleaseBuilder::new(&runner, project.settings());

    let err = builder.build(&ProfileName::Release.profile()).unwrap_err();

    assert!(matches!(err, BuildError::MissingOutput { ref path } if path.ends_with("atc_game.js")));
}
