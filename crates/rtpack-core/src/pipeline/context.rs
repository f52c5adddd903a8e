//! Shared state for one build run.
//!
//! Groups the collaborators every stage needs so they are passed around as a
//! single reference. A context is owned by exactly one run.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, SigningCredentials};
use crate::hooks::HookRunner;
use crate::layout::ScratchLayout;
use crate::manifest::ManifestResolver;
use crate::packager::{CommandPackager, Packager};
use crate::reporter::Reporter;

#[derive(Clone)]
pub struct BuildContext {
    pub client: Client,
    pub config: Arc<Config>,
    /// Directory relative config paths are resolved against.
    pub working_dir: PathBuf,
    pub layout: ScratchLayout,
    pub output_dir: PathBuf,
    pub resolver: ManifestResolver,
    pub reporter: Arc<dyn Reporter>,
    pub packager: Arc<dyn Packager>,
    pub hooks: HookRunner,
    pub credentials: Option<SigningCredentials>,
    pub cancel: CancellationToken,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("working_dir", &self.working_dir)
            .field("layout", &self.layout)
            .field("output_dir", &self.output_dir)
            .field("signing", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Context using the configured packager command. Signing is off until
    /// [`with_credentials`](Self::with_credentials) is called.
    pub fn new(
        config: Config,
        working_dir: impl Into<PathBuf>,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Self {
        let working_dir = working_dir.into();
        let client = Client::new();
        let layout = ScratchLayout::new(working_dir.join(&config.build.scratch_dir));
        let output_dir = working_dir.join(&config.build.output_dir);
        let resolver = ManifestResolver::new(client.clone(), config.runtime.clone());
        let packager = CommandPackager::new(
            config.build.packager.clone(),
            config.build.packager_target_args.clone(),
            &working_dir,
        );
        let hooks = HookRunner::new(config.hooks.clone(), &working_dir, &output_dir);

        Self {
            client,
            config: Arc::new(config),
            working_dir,
            layout,
            output_dir,
            resolver,
            reporter,
            packager: Arc::new(packager),
            hooks,
            credentials: None,
            cancel,
        }
    }

    pub fn with_packager(mut self, packager: Arc<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<SigningCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
