use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use tracing::{error, info, warn};

use crate::models::{Admin, AdminUpdate};
use crate::services::config_loader::SourceConfig;

pub enum AdminSource {
    Http(HttpAdminSource),
    File(PathBuf),
}

pub struct HttpAdminSource {
    client: Client,
    admins_url: String,
    api_key: Option<String>,
}

#[derive(Debug)]
pub enum FetchEvent {
    Finished { admins: Vec<Admin> },
    Failed { message: String },
}

#[derive(Debug)]
pub enum UpdateEvent {
    Finished { id: String },
    Failed { id: String, message: String },
}

impl AdminSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        match config {
            SourceConfig::Http {
                base_url,
                admins_path,
                api_key,
                timeout_seconds,
            } => {
                let base = base_url.trim().trim_end_matches('/');
                if base.is_empty() {
                    bail!("source.base_url is empty");
                }
                let client = Client::builder()
                    .timeout(Duration::from_secs((*timeout_seconds).max(1)))
                    .build()
                    .context("failed to build HTTP client")?;
                Ok(AdminSource::Http(HttpAdminSource {
                    client,
                    admins_url: format!("{}/{}", base, admins_path.trim_start_matches('/')),
                    api_key: api_key.clone().filter(|key| !key.trim().is_empty()),
                }))
            }
            SourceConfig::File { path } => Ok(AdminSource::File(path.clone())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AdminSource::Http(http) => http.admins_url.clone(),
            AdminSource::File(path) => path.display().to_string(),
        }
    }

    pub async fn fetch_public_admins(&self) -> Result<Vec<Admin>> {
        match self {
            AdminSource::Http(http) => http.fetch_public_admins().await,
            AdminSource::File(path) => read_admin_file(path),
        }
    }

    pub async fn update_admin(&self, update: &AdminUpdate) -> Result<()> {
        match self {
            AdminSource::Http(http) => http.update_admin(update).await,
            AdminSource::File(path) => update_admin_file(path, update),
        }
    }
}

impl HttpAdminSource {
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn fetch_public_admins(&self) -> Result<Vec<Admin>> {
        let request = self
            .client
            .get(&self.admins_url)
            .query(&[("select", "*"), ("order", "total_points.desc")]);
        let response = self
            .authorize(request)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.admins_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("GET {} returned {}: {}", self.admins_url, status, body);
        }

        response
            .json::<Vec<Admin>>()
            .await
            .context("failed to decode admin list")
    }

    async fn update_admin(&self, update: &AdminUpdate) -> Result<()> {
        let request = self
            .client
            .patch(&self.admins_url)
            .query(&[("id", format!("eq.{}", update.id))])
            .json(update);
        let response = self
            .authorize(request)
            .send()
            .await
            .with_context(|| format!("update request for admin {} failed", update.id))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("PATCH admin {} returned {}: {}", update.id, status, body);
        }
        Ok(())
    }
}

fn read_admin_file(path: &Path) -> Result<Vec<Admin>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read admin file {}", path.display()))?;
    serde_json::from_str::<Vec<Admin>>(&raw)
        .with_context(|| format!("failed to parse admin file {}", path.display()))
}

fn update_admin_file(path: &Path, update: &AdminUpdate) -> Result<()> {
    let mut admins = read_admin_file(path)?;
    let Some(admin) = admins.iter_mut().find(|admin| admin.id == update.id) else {
        bail!("admin {} not found in {}", update.id, path.display());
    };
    admin.name = update.name.clone();
    admin.admin_id = update.admin_id.clone();
    admin.avatar_url = update.avatar_url.clone();

    let raw = serde_json::to_string_pretty(&admins).context("failed to encode admin list")?;
    fs::write(path, raw).with_context(|| format!("failed to write admin file {}", path.display()))
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to initialize fetch runtime")
}

/// Runs one fetch on a worker thread; the result arrives on the returned channel.
pub fn spawn_admin_fetch(source: std::sync::Arc<AdminSource>) -> Receiver<FetchEvent> {
    let (tx, rx) = mpsc::channel::<FetchEvent>();

    thread::spawn(move || {
        let result = build_runtime().and_then(|runtime| {
            runtime.block_on(async { source.fetch_public_admins().await })
        });

        let event = match result {
            Ok(admins) => {
                info!(
                    "Fetched {} admin(s) from {}",
                    admins.len(),
                    source.describe()
                );
                FetchEvent::Finished { admins }
            }
            Err(err) => {
                error!("Error loading admins from {}: {:#}", source.describe(), err);
                FetchEvent::Failed {
                    message: format!("{err:#}"),
                }
            }
        };
        if tx.send(event).is_err() {
            warn!("Admin fetch finished after the page went away");
        }
    });

    rx
}

pub fn spawn_admin_update(
    source: std::sync::Arc<AdminSource>,
    update: AdminUpdate,
) -> Receiver<UpdateEvent> {
    let (tx, rx) = mpsc::channel::<UpdateEvent>();

    thread::spawn(move || {
        info!("Updating admin {}", update.id);
        let result = build_runtime()
            .and_then(|runtime| runtime.block_on(async { source.update_admin(&update).await }));

        let event = match result {
            Ok(()) => {
                info!("Admin {} updated", update.id);
                UpdateEvent::Finished { id: update.id }
            }
            Err(err) => {
                error!("Error updating admin {}: {:#}", update.id, err);
                UpdateEvent::Failed {
                    id: update.id,
                    message: format!("{err:#}"),
                }
            }
        };
        if tx.send(event).is_err() {
            warn!("Admin update finished after the page went away");
        }
    });

    rx
}
