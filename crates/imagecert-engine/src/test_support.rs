use crate::check::{Check, CheckError, Requirement};
use crate::target::Target;
use camino::{Utf8Path, Utf8PathBuf};
use imagecert_sandbox::{SandboxError, SandboxRequest, SandboxRunner};
use imagecert_types::{HelpText, Level, Metadata, Results};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    Pass,
    Fail,
    Error,
    /// Pass when `marker` exists under the target root.
    FileExists(&'static str),
}

/// A check with scripted behavior that records the targets it was given.
pub struct StubCheck {
    name: &'static str,
    requirement: Requirement,
    behavior: Behavior,
    calls: AtomicUsize,
    seen: Mutex<Vec<Target>>,
}

impl StubCheck {
    pub fn new(name: &'static str, requirement: Requirement, behavior: Behavior) -> Self {
        Self {
            name,
            requirement,
            behavior,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn passing(name: &'static str) -> Self {
        Self::new(name, Requirement::Reference, Behavior::Pass)
    }

    pub fn failing(name: &'static str) -> Self {
        Self::new(name, Requirement::Reference, Behavior::Fail)
    }

    pub fn erroring(name: &'static str) -> Self {
        Self::new(name, Requirement::Reference, Behavior::Error)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Target> {
        self.seen.lock().expect("lock").clone()
    }
}

impl Check for StubCheck {
    fn name(&self) -> &'static str {
        self.name
    }

    fn requirement(&self) -> Requirement {
        self.requirement
    }

    fn validate(&self, target: &Target) -> Result<bool, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().expect("lock").push(target.clone());
        match self.behavior {
            Behavior::Pass => Ok(true),
            Behavior::Fail => Ok(false),
            Behavior::Error => Err(CheckError::Invalid(format!("{} exploded", self.name))),
            Behavior::FileExists(marker) => match target {
                Target::Local(root) => Ok(root.join(marker).exists()),
                Target::Image(_) => Err(CheckError::Invalid("needs a local root".to_string())),
            },
        }
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(format!("stub {}", self.name), Level::Good)
    }

    fn help(&self) -> HelpText {
        HelpText::new("stub", "stub")
    }
}

impl<'a, C: Check + ?Sized> Check for &'a C {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn requirement(&self) -> Requirement {
        (**self).requirement()
    }

    fn validate(&self, target: &Target) -> Result<bool, CheckError> {
        (**self).validate(target)
    }

    fn metadata(&self) -> Metadata {
        (**self).metadata()
    }

    fn help(&self) -> HelpText {
        (**self).help()
    }
}

/// Leak a stub so the test can keep inspecting it after registering it.
pub fn leak(check: StubCheck) -> &'static StubCheck {
    Box::leak(Box::new(check))
}

type Responder = Box<dyn Fn(&SandboxRequest) -> Result<Results, SandboxError> + Send + Sync>;

/// In-process stand-in for the sandbox bridge.
pub struct FakeRunner {
    respond: Responder,
    requests: Mutex<Vec<SandboxRequest>>,
}

impl FakeRunner {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&SandboxRequest) -> Result<Results, SandboxError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SandboxRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

impl SandboxRunner for FakeRunner {
    fn run_check(&self, request: &SandboxRequest) -> Result<Results, SandboxError> {
        self.requests.lock().expect("lock").push(request.clone());
        (self.respond)(request)
    }
}

/// A throwaway root filesystem.
pub struct RootFs {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl RootFs {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 tempdir");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn target(&self) -> Target {
        Target::Local(self.root.clone())
    }

    pub fn dir(&self, rel: &str) {
        std::fs::create_dir_all(self.root.join(rel)).expect("mkdir");
    }

    pub fn file(&self, rel: &str, contents: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir parent");
        }
        std::fs::write(path, contents).expect("write file");
    }
}
