//! Operator script execution on qualifying alerts.
//!
//! A round writes the event context to the configured env file, discovers
//! executable `*.sh` files in the scripts directory, and runs each with
//! `/bin/bash` under a per-script timeout with the context exported as
//! environment variables. Scripts run sequentially and the round aborts on
//! the first non-zero exit. Rounds are dispatched off the tick path, so a
//! slow round never stalls sampling.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::logger::metric_label;
use crate::snapshot::Snapshot;

pub struct ScriptRunner {
    dir: PathBuf,
    env_file: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(dir: &Path, env_file: &Path, timeout: Duration) -> Self {
        ScriptRunner {
            dir: dir.to_path_buf(),
            env_file: env_file.to_path_buf(),
            timeout,
        }
    }

    /// Runs one alert round: env file first, then each discovered script.
    pub async fn execute(&self, reasons: &[&'static str], snap: &Snapshot) -> Result<()> {
        let env = build_env(reasons, snap);

        self.write_env_file(&env)
            .context("failed to write env file")?;

        let scripts = self.find_scripts().context("failed to find scripts")?;
        debug!("running {} alert scripts", scripts.len());

        for script in scripts {
            self.run_script(&script, &env)
                .await
                .with_context(|| format!("script {} failed", script.display()))?;
            info!("alert script {} completed", script.display());
        }

        Ok(())
    }

    /// Rewrites the env file with KEY=VALUE lines, truncating any previous
    /// content.
    fn write_env_file(&self, env: &[(String, String)]) -> Result<()> {
        let mut content = String::new();
        for (key, value) in env {
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push('\n');
        }
        fs::write(&self.env_file, content)?;
        Ok(())
    }

    /// Selects regular `*.sh` files with any execute bit set, in the
    /// directory's natural enumeration order.
    fn find_scripts(&self) -> Result<Vec<PathBuf>> {
        let mut scripts = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            if !meta.is_file() {
                continue;
            }

            let name = entry.file_name();
            let name = match name.to_str() {
                Some(n) => n,
                None => continue,
            };
            if !name.ends_with(".sh") {
                continue;
            }
            if meta.permissions().mode() & 0o111 == 0 {
                continue;
            }

            scripts.push(entry.path());
        }

        Ok(scripts)
    }

    async fn run_script(&self, script: &Path, env: &[(String, String)]) -> Result<()> {
        let mut command = Command::new("/bin/bash");
        command
            .arg(script)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);

        let mut child = command.spawn().context("failed to spawn")?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.context("failed to wait")?,
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                bail!("timed out after {}s", self.timeout.as_secs());
            }
        };

        if !status.success() {
            bail!("exit code {}", status.code().unwrap_or(-1));
        }

        Ok(())
    }
}

/// Builds the script environment from the alert context. Floats are
/// rendered with two decimals, integers plain.
fn build_env(reasons: &[&'static str], snap: &Snapshot) -> Vec<(String, String)> {
    let pairs: [(&str, String); 12] = [
        ("SYS_TIMESTAMP", snap.timestamp.to_rfc3339()),
        ("SYS_EVENT_TYPE", "alert".to_string()),
        ("SYS_EVENT_METRIC", metric_label(reasons)),
        ("SYS_CPU_USAGE", format!("{:.2}", snap.cpu_usage_percent)),
        (
            "SYS_MEM_USED_PERCENT",
            format!("{:.2}", snap.mem_used_percent),
        ),
        ("SYS_MEM_USED_BYTES", snap.mem_used_bytes.to_string()),
        ("SYS_MEM_TOTAL_BYTES", snap.mem_total_bytes.to_string()),
        ("SYS_NET_INTERFACE", snap.net_interface.clone()),
        (
            "SYS_NET_RX_BPS",
            format!("{:.2}", snap.net_rx_bytes_per_sec),
        ),
        (
            "SYS_NET_TX_BPS",
            format!("{:.2}", snap.net_tx_bytes_per_sec),
        ),
        ("SYS_NET_RX_MBPS", format!("{:.2}", snap.net_rx_mbps)),
        ("SYS_NET_TX_MBPS", format!("{:.2}", snap.net_tx_mbps)),
    ];

    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn test_snapshot() -> Snapshot {
        Snapshot {
            timestamp: "2026-08-27T10:00:00Z".parse().unwrap(),
            cpu_usage_percent: 91.239,
            mem_used_percent: 75.5,
            mem_used_bytes: 12_000_000_000,
            mem_total_bytes: 16_000_000_000,
            net_interface: "eth0".to_string(),
            net_rx_bytes_per_sec: 1250.0,
            net_tx_bytes_per_sec: 0.0,
            net_rx_mbps: 0.01,
            net_tx_mbps: 0.0,
        }
    }

    fn write_script(dir: &Path, name: &str, body: &str, mode: u32) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/bash\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_build_env_formatting() {
        let env = build_env(&["cpu"], &test_snapshot());
        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("SYS_EVENT_TYPE"), "alert");
        assert_eq!(get("SYS_EVENT_METRIC"), "cpu");
        assert_eq!(get("SYS_CPU_USAGE"), "91.24");
        assert_eq!(get("SYS_MEM_USED_BYTES"), "12000000000");
        assert_eq!(get("SYS_NET_INTERFACE"), "eth0");
        assert_eq!(get("SYS_NET_RX_BPS"), "1250.00");
        assert_eq!(get("SYS_TIMESTAMP"), "2026-08-27T10:00:00+00:00");
        assert_eq!(env.len(), 12);
    }

    #[test]
    fn test_build_env_multi_metric() {
        let env = build_env(&["cpu", "network"], &test_snapshot());
        let metric = env
            .iter()
            .find(|(k, _)| k == "SYS_EVENT_METRIC")
            .map(|(_, v)| v.as_str());
        assert_eq!(metric, Some("multi"));
    }

    #[test]
    fn test_find_scripts_filters() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "notify.sh", "true", 0o755);
        write_script(dir.path(), "plain.sh", "true", 0o644);
        write_script(dir.path(), "tool.py", "true", 0o755);
        fs::create_dir(dir.path().join("sub.sh")).unwrap();

        let runner = ScriptRunner::new(dir.path(), Path::new("/dev/null"), Duration::from_secs(5));
        let scripts = runner.find_scripts().unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].file_name().unwrap(), "notify.sh");
    }

    #[tokio::test]
    async fn test_execute_injects_environment() {
        let scripts_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let out = out_dir.path().join("out");
        write_script(
            scripts_dir.path(),
            "capture.sh",
            &format!("echo -n \"$SYS_EVENT_METRIC\" > {}", out.display()),
            0o755,
        );

        let env_file = out_dir.path().join("env");
        let runner = ScriptRunner::new(scripts_dir.path(), &env_file, Duration::from_secs(10));

        let mut snap = test_snapshot();
        snap.timestamp = Utc::now();
        runner.execute(&["memory"], &snap).await.unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "memory");

        let env_content = fs::read_to_string(&env_file).unwrap();
        assert!(env_content.contains("SYS_EVENT_METRIC=memory\n"));
        assert!(env_content.contains("SYS_EVENT_TYPE=alert\n"));
    }

    #[tokio::test]
    async fn test_execute_reports_exit_code() {
        let scripts_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        write_script(scripts_dir.path(), "fail.sh", "exit 3", 0o755);

        let runner = ScriptRunner::new(
            scripts_dir.path(),
            &out_dir.path().join("env"),
            Duration::from_secs(10),
        );

        let err = runner.execute(&["cpu"], &test_snapshot()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("exit code 3"));
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let scripts_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        write_script(scripts_dir.path(), "slow.sh", "sleep 30", 0o755);

        let runner = ScriptRunner::new(
            scripts_dir.path(),
            &out_dir.path().join("env"),
            Duration::from_secs(1),
        );

        let err = runner.execute(&["cpu"], &test_snapshot()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("timed out"));
    }

    #[tokio::test]
    async fn test_unwritable_env_file_aborts_round() {
        let scripts_dir = tempdir().unwrap();
        write_script(scripts_dir.path(), "ok.sh", "true", 0o755);

        let runner = ScriptRunner::new(
            scripts_dir.path(),
            Path::new("/nonexistent/dir/.env"),
            Duration::from_secs(10),
        );

        let err = runner.execute(&["cpu"], &test_snapshot()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("env file"));
    }
}
