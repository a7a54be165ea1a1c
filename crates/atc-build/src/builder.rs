//! Release build for the browser target.
//!
//! Two hard-gated steps: compile with the profile's flags, then generate the
//! browser bindings package from the compiled module. A failed compile never
//! reaches the bindings generator, so a stale module is never re-wrapped.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

use atc_common::{CommandOutput, CommandRunner, CommandSpec};
use tracing::{debug, info, info_span};

use crate::error::BuildError;
use crate::profile::{BuildProfile, ProfileName};

/// Where the build reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Cargo workspace holding the game.
    pub project_root: PathBuf,
    /// `-p` package to build, if the root is a workspace.
    pub package: Option<String>,
    /// Binary name; the compiled module is `<binary>.wasm`.
    pub binary: String,
    /// Cargo target directory (defaults to `<project_root>/target`).
    pub target_dir: Option<PathBuf>,
    /// Output directory for the bindings package.
    pub out_dir: PathBuf,
    /// Package name passed to the bindings generator.
    pub out_name: String,
    pub cargo: OsString,
    pub wasm_bindgen: OsString,
    /// Forward tool output to the terminal instead of capturing it.
    pub stream_output: bool,
}

impl BuildSettings {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            out_dir: project_root.join("out"),
            project_root,
            package: None,
            binary: "atc-game".to_string(),
            target_dir: None,
            out_name: "atc_game".to_string(),
            cargo: OsString::from("cargo"),
            wasm_bindgen: OsString::from("wasm-bindgen"),
            stream_output: false,
        }
    }

    pub fn target_dir(&self) -> PathBuf {
        self.target_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join("target"))
    }

    /// Path of the compiled module for `profile`.
    pub fn compiled_module(&self, profile: &BuildProfile) -> PathBuf {
        self.target_dir()
            .join(profile.target())
            .join("release")
            .join(format!("{}.wasm", self.binary))
    }

    /// JS loader written by the bindings generator.
    pub fn loader_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.js", self.out_name))
    }

    /// Browser-loadable wasm written by the bindings generator.
    pub fn bindings_wasm_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}_bg.wasm", self.out_name))
    }
}

/// Files produced by one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutputSet {
    pub profile: ProfileName,
    /// Module emitted by the compiler, inside the target directory.
    pub compiled_module: PathBuf,
    /// JS loader in the output directory.
    pub loader: PathBuf,
    /// Wasm binary in the output directory.
    pub bindings_wasm: PathBuf,
}

impl BuildOutputSet {
    /// Files that land in the deployable directory.
    pub fn deployable_files(&self) -> [&Path; 2] {
        [&self.loader, &self.bindings_wasm]
    }
}

/// Compiles the game for the web and generates its bindings package.
pub struct ReleaseBuilder<R> {
    runner: R,
    settings: BuildSettings,
}

impl<R: CommandRunner> ReleaseBuilder<R> {
    pub fn new(runner: R, settings: BuildSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Compile command for `profile`.
    ///
    /// Always names the target directory, so `CARGO_TARGET_DIR` or a
    /// `.cargo/config` override cannot send the module somewhere other than
    /// [`BuildSettings::compiled_module`].
    pub fn compile_command(&self, profile: &BuildProfile) -> CommandSpec {
        let settings = &self.settings;
        let mut spec = CommandSpec::new(&settings.cargo, &settings.project_root)
            .args(["build", "--release", "--target", profile.target()])
            .stream_output(settings.stream_output);
        if let Some(package) = &settings.package {
            spec = spec.arg("-p").arg(package);
        }
        spec = spec.arg("--target-dir").arg(settings.target_dir());
        if let Some(flags) = profile.rustflags_env() {
            spec = spec.env("RUSTFLAGS", flags);
        }
        spec
    }

    /// Bindings generator command for a compiled module.
    pub fn bindings_command(&self, module: &Path) -> CommandSpec {
        let settings = &self.settings;
        CommandSpec::new(&settings.wasm_bindgen, &settings.project_root)
            .args(["--target", "web", "--no-typescript", "--out-dir"])
            .arg(&settings.out_dir)
            .arg("--out-name")
            .arg(&settings.out_name)
            .arg(module)
            .stream_output(settings.stream_output)
    }

    /// Host debug build, without any web profile flags.
    pub fn native_command(&self) -> CommandSpec {
        let settings = &self.settings;
        let mut spec = CommandSpec::new(&settings.cargo, &settings.project_root)
            .arg("build")
            .stream_output(settings.stream_output);
        if let Some(package) = &settings.package {
            spec = spec.arg("-p").arg(package);
        }
        if let Some(target_dir) = &settings.target_dir {
            spec = spec.arg("--target-dir").arg(target_dir);
        }
        spec
    }

    pub fn build_native(&self) -> Result<(), BuildError> {
        let command = self.native_command();
        info!(command = %command.display(), "building for host");
        let output = self.run("cargo build", &command)?;
        if !output.is_success() {
            return Err(BuildError::Compile {
                target: "host".to_string(),
                code: output.code,
                message: failure_message(&output, self.settings.stream_output),
            });
        }
        Ok(())
    }

    pub fn build(&self, profile: &BuildProfile) -> Result<BuildOutputSet, BuildError> {
        let span = info_span!("release_build", profile = %profile.name(), target = profile.target());
        let _guard = span.enter();
        let start = Instant::now();

        // Step 1: compile.
        let compile = self.compile_command(profile);
        let rustflags = profile.rustflags_env().unwrap_or_default();
        info!(command = %compile.display(), %rustflags, "compiling");
        let output = self.run("cargo build", &compile)?;
        if !output.is_success() {
            return Err(BuildError::Compile {
                target: profile.target().to_string(),
                code: output.code,
                message: failure_message(&output, self.settings.stream_output),
            });
        }

        let module = self.settings.compiled_module(profile);
        if !module.is_file() {
            return Err(BuildError::MissingModule { path: module });
        }
        debug!(module = %module.display(), "compiled");

        // Step 2: bindings, only after a successful compile.
        std::fs::create_dir_all(&self.settings.out_dir).map_err(|source| BuildError::Io {
            path: self.settings.out_dir.clone(),
            source,
        })?;
        let bindings = self.bindings_command(&module);
        info!(command = %bindings.display(), "generating bindings");
        let output = self.run("wasm-bindgen", &bindings)?;
        if !output.is_success() {
            return Err(BuildError::Bindings {
                code: output.code,
                message: failure_message(&output, self.settings.stream_output),
            });
        }

        let outputs = BuildOutputSet {
            profile: profile.name(),
            compiled_module: module,
            loader: self.settings.loader_path(),
            bindings_wasm: self.settings.bindings_wasm_path(),
        };
        for path in outputs.deployable_files() {
            if !path.is_file() {
                return Err(BuildError::MissingOutput {
                    path: path.to_path_buf(),
                });
            }
        }

        info!(
            out_dir = %self.settings.out_dir.display(),
            duration_ms = start.elapsed().as_millis(),
            "release build complete"
        );
        Ok(outputs)
    }

    fn run(&self, step: &'static str, spec: &CommandSpec) -> Result<CommandOutput, BuildError> {
        self.runner
            .run(spec)
            .map_err(|source| BuildError::Process { step, source })
    }
}

fn failure_message(output: &CommandOutput, streamed: bool) -> String {
    let diagnostic = output.diagnostic();
    if diagnostic.is_empty() && streamed {
        "see tool output above".to_string()
    } else {
        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileName;

    struct NoopRunner;

    impl CommandRunner for NoopRunner {
        fn run(&self, _spec: &CommandSpec) -> Result<CommandOutput, atc_common::ProcessError> {
            Ok(CommandOutput::success())
        }
    }

    fn builder() -> ReleaseBuilder<NoopRunner> {
        let mut settings = BuildSettings::new("/work/game");
        settings.package = Some("atc-game".to_string());
        ReleaseBuilder::new(NoopRunner, settings)
    }

    #[test]
    fn test_compile_command_for_max_profile() {
        let spec = builder().compile_command(&ProfileName::Max.profile());
        insta::assert_snapshot!(
            spec.display(),
            @"cargo build --release --target wasm32-unknown-unknown -p atc-game --target-dir /work/game/target"
        );
        assert_eq!(
            spec.env_value("RUSTFLAGS").and_then(|v| v.to_str()),
            Some("-C opt-level=z -C lto=thin -C embed-bitcode=yes")
        );
        assert_eq!(spec.cwd, Path::new("/work/game"));
    }

    #[test]
    fn test_compile_command_pins_custom_target_dir() {
        let mut settings = BuildSettings::new("/work/game");
        settings.target_dir = Some(PathBuf::from("/cache/atc"));
        let builder = ReleaseBuilder::new(NoopRunner, settings);
        let profile = ProfileName::Release.profile();

        let spec = builder.compile_command(&profile);

        let args: Vec<_> = spec.args.iter().map(|arg| arg.to_string_lossy()).collect();
        let at = args.iter().position(|arg| arg == "--target-dir").unwrap();
        assert_eq!(args[at + 1], "/cache/atc");
        assert!(
            builder
                .settings()
                .compiled_module(&profile)
                .starts_with("/cache/atc")
        );
    }

    #[test]
    fn test_release_profile_sets_no_rustflags() {
        let spec = builder().compile_command(&ProfileName::Release.profile());
        assert_eq!(spec.env_value("RUSTFLAGS"), None);
    }

    #[test]
    fn test_bindings_command() {
        let builder = builder();
        let module = builder
            .settings()
            .compiled_module(&ProfileName::Release.profile());
        assert_eq!(
            module,
            Path::new("/work/game/target/wasm32-unknown-unknown/release/atc-game.wasm")
        );
        let spec = builder.bindings_command(&module);
        insta::assert_snapshot!(
            spec.display(),
            @"wasm-bindgen --target web --no-typescript --out-dir /work/game/out --out-name atc_game /work/game/target/wasm32-unknown-unknown/release/atc-game.wasm"
        );
    }

    #[test]
    fn test_native_command_has_no_web_target() {
        let spec = builder().native_command();
        insta::assert_snapshot!(spec.display(), @"cargo build -p atc-game");
        assert!(!spec.has_arg("--target"));
    }

    #[test]
    fn test_output_paths() {
        let settings = BuildSettings::new("/work/game");
        assert_eq!(settings.loader_path(), Path::new("/work/game/out/atc_game.js"));
        assert_eq!(
            settings.bindings_wasm_path(),
            Path::new("/work/game/out/atc_game_bg.wasm")
        );
    }
}
