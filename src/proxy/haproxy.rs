//! HAProxy implementation of the `Proxy` capability.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::exec::ProcessRunner;
use crate::proxy::{Proxy, ProxyError};
use crate::storage::FileSystem;

/// Name of the assembled config inside the configs directory.
pub const CONFIG_FILENAME: &str = "haproxy.cfg";

const DEFAULT_BASE: &str = "global
\tpidfile /var/run/haproxy.pid
\ttune.ssl.default-dh-param 2048

defaults
\tmode http
\tbalance roundrobin
\toption dontlognull
\toption dontlog-normal
\ttimeout connect 5s
\ttimeout client 20s
\ttimeout server 20s
\ttimeout queue 30s

listen stats
\tbind *:8081
\tstats enable
\tstats uri /stats
";

/// Settings of the local HAProxy installation.
#[derive(Debug, Clone)]
pub struct HaProxySettings {
    pub binary: String,
    pub pid_file: PathBuf,
    pub base_template: String,
    pub configs_path: PathBuf,
}

pub struct HaProxy {
    settings: HaProxySettings,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn ProcessRunner>,
}

impl HaProxy {
    pub fn new(
        settings: HaProxySettings,
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self { settings, fs, runner }
    }

    async fn base_config(&self, templates_path: &Path) -> Result<String, ProxyError> {
        let path = templates_path.join(&self.settings.base_template);
        match self.fs.read_to_string(&path).await {
            Ok(base) => Ok(base),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DEFAULT_BASE.to_string()),
            Err(source) => Err(io_error(&path, source)),
        }
    }

    async fn running_pid(&self) -> Option<String> {
        match self.fs.read_to_string(&self.settings.pid_file).await {
            Ok(pid) => Some(pid.trim().to_string()).filter(|p| !p.is_empty()),
            Err(_) => None,
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> ProxyError {
    ProxyError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl Proxy for HaProxy {
    async fn create_config_from_templates(
        &self,
        templates_path: &Path,
        configs_path: &Path,
    ) -> Result<(), ProxyError> {
        let mut config = self.base_config(templates_path).await?;

        let fragments = self
            .fs
            .list_files(configs_path)
            .await
            .map_err(|e| io_error(configs_path, e))?;

        let mut count = 0;
        for fragment in fragments {
            let is_cfg = fragment.extension().is_some_and(|ext| ext == "cfg");
            let is_output = fragment.file_name().is_some_and(|name| name == CONFIG_FILENAME);
            if !is_cfg || is_output {
                continue;
            }
            let content = self
                .fs
                .read_to_string(&fragment)
                .await
                .map_err(|e| io_error(&fragment, e))?;
            config.push('\n');
            config.push_str(content.trim_end());
            config.push('\n');
            count += 1;
        }

        let output = configs_path.join(CONFIG_FILENAME);
        self.fs
            .write(&output, &config, 0o664)
            .await
            .map_err(|e| io_error(&output, e))?;

        tracing::info!(path = %output.display(), fragments = count, "Proxy config assembled");
        Ok(())
    }

    async fn reload(&self) -> Result<(), ProxyError> {
        let config = self.settings.configs_path.join(CONFIG_FILENAME);
        let mut args = vec![
            "-f".to_string(),
            config.display().to_string(),
            "-D".to_string(),
            "-p".to_string(),
            self.settings.pid_file.display().to_string(),
        ];
        let previous = self.running_pid().await;
        if let Some(pid) = &previous {
            args.push("-sf".to_string());
            args.push(pid.clone());
        }

        self.runner.run(&self.settings.binary, &args).await?;

        tracing::info!(previous_pid = ?previous, "Proxy reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandError;
    use crate::storage::LocalFs;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<(), CommandError> {
            self.calls.lock().unwrap().push((program.to_string(), args.to_vec()));
            Ok(())
        }
    }

    fn haproxy(dir: &Path, runner: Arc<RecordingRunner>) -> HaProxy {
        HaProxy::new(
            HaProxySettings {
                binary: "haproxy".into(),
                pid_file: dir.join("haproxy.pid"),
                base_template: "haproxy.tmpl".into(),
                configs_path: dir.join("cfg"),
            },
            Arc::new(LocalFs),
            runner,
        )
    }

    #[tokio::test]
    async fn test_assembles_fragments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let tmpl = dir.path().join("tmpl");
        let cfg = dir.path().join("cfg");
        std::fs::create_dir_all(&tmpl).unwrap();
        std::fs::create_dir_all(&cfg).unwrap();
        std::fs::write(tmpl.join("haproxy.tmpl"), "global\n").unwrap();
        std::fs::write(cfg.join("b.cfg"), "backend b-be\n").unwrap();
        std::fs::write(cfg.join("a.cfg"), "backend a-be\n").unwrap();
        std::fs::write(cfg.join("notes.txt"), "ignored").unwrap();

        let proxy = haproxy(dir.path(), Arc::new(RecordingRunner::default()));
        proxy.create_config_from_templates(&tmpl, &cfg).await.unwrap();
        // A second pass must not fold the previous output back in.
        proxy.create_config_from_templates(&tmpl, &cfg).await.unwrap();

        let assembled = std::fs::read_to_string(cfg.join(CONFIG_FILENAME)).unwrap();
        assert_eq!(assembled, "global\n\nbackend a-be\n\nbackend b-be\n");
    }

    #[tokio::test]
    async fn test_default_base_when_template_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("cfg");
        std::fs::create_dir_all(&cfg).unwrap();

        let proxy = haproxy(dir.path(), Arc::new(RecordingRunner::default()));
        proxy
            .create_config_from_templates(&dir.path().join("missing"), &cfg)
            .await
            .unwrap();

        let assembled = std::fs::read_to_string(cfg.join(CONFIG_FILENAME)).unwrap();
        assert!(assembled.starts_with("global"));
    }

    #[tokio::test]
    async fn test_reload_without_pid_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::default());

        haproxy(dir.path(), runner.clone()).reload().await.unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "haproxy");
        assert!(!calls[0].1.contains(&"-sf".to_string()));
    }

    #[tokio::test]
    async fn test_reload_passes_previous_pid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("haproxy.pid"), "123\n").unwrap();
        let runner = Arc::new(RecordingRunner::default());

        haproxy(dir.path(), runner.clone()).reload().await.unwrap();

        let calls = runner.calls.lock().unwrap();
        let args = &calls[0].1;
        assert_eq!(&args[args.len() - 2..], &["-sf".to_string(), "123".to_string()]);
    }
}
