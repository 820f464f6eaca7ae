use super::{ContainerOverview, ContainerRuntime, ContainerStats, MetricsError, GB, KB, MB};

use std::process::{Command, Output};

use serde::Deserialize;

/// `ContainerRuntime` backed by the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    service: String,
}

impl DockerCli {
    pub fn new(program: &str, service: &str) -> DockerCli {
        DockerCli {
            program: program.to_string(),
            service: service.to_string(),
        }
    }

    fn docker(&self, args: &[&str]) -> Result<String, MetricsError> {
        let output = Command::new(&self.program).args(args).output()?;
        checked(format!("{} {}", self.program, args.join(" ")), output)
    }

    fn service_active(&self) -> Result<bool, MetricsError> {
        let status = Command::new("systemctl")
            .args(["is-active", "--quiet", &self.service])
            .status()?;
        Ok(status.success())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        DockerCli::new("docker", "docker")
    }
}

fn checked(command: String, output: Output) -> Result<String, MetricsError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        };
        return Err(MetricsError::Command { command, detail });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl ContainerRuntime for DockerCli {
    fn overview(&self) -> Result<ContainerOverview, MetricsError> {
        if !self.service_active()? {
            return Ok(ContainerOverview {
                active: false,
                states: Vec::new(),
            });
        }
        let out = self.docker(&["ps", "--all", "--format", "{{.State}}"])?;
        Ok(ContainerOverview {
            active: true,
            states: parse_states(&out),
        })
    }

    fn stats(&self) -> Result<Vec<ContainerStats>, MetricsError> {
        let out = self.docker(&["stats", "--no-stream", "--format", "{{json .}}"])?;
        parse_stats(&out)
    }
}

fn parse_states(out: &str) -> Vec<String> {
    out.lines()
        .map(|l| l.trim().trim_end_matches(',').to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[derive(Deserialize)]
struct RawStats {
    #[serde(rename = "CPUPerc")]
    cpu_perc: String,
    #[serde(rename = "MemUsage")]
    mem_usage: String,
    #[serde(rename = "PIDs")]
    pids: String,
}

/// Parse `docker stats --format '{{json .}}'` output, one object per line.
fn parse_stats(out: &str) -> Result<Vec<ContainerStats>, MetricsError> {
    let mut stats = Vec::new();
    for line in out.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let raw: RawStats = serde_json::from_str(line).map_err(|_| MetricsError::Parse {
            what: "container stats",
            input: line.to_string(),
        })?;
        let (used, limit) = raw.mem_usage.split_once(" / ").ok_or_else(|| MetricsError::Parse {
            what: "memory usage",
            input: raw.mem_usage.clone(),
        })?;
        let pids = raw.pids.trim().parse().map_err(|_| MetricsError::Parse {
            what: "pid count",
            input: raw.pids.clone(),
        })?;
        stats.push(ContainerStats {
            cpu_percent: parse_percent(&raw.cpu_perc)?,
            mem_used: parse_memory(used)?,
            mem_limit: parse_memory(limit)?,
            pids,
        });
    }
    Ok(stats)
}

/// "12.5%" -> 12.5
pub fn parse_percent(s: &str) -> Result<f64, MetricsError> {
    let s = s.trim();
    s.trim_end_matches('%').trim().parse().map_err(|_| MetricsError::Parse {
        what: "percentage",
        input: s.to_string(),
    })
}

/// "1.5GiB" -> bytes. Binary and decimal suffixes are accepted.
pub fn parse_memory(s: &str) -> Result<f64, MetricsError> {
    let s = s.trim();
    const UNITS: [(&str, f64); 7] = [
        ("KiB", KB),
        ("MiB", MB),
        ("GiB", GB),
        ("kB", 1e3),
        ("MB", 1e6),
        ("GB", 1e9),
        ("B", 1.0),
    ];
    for (suffix, scale) in UNITS {
        if let Some(num) = s.strip_suffix(suffix) {
            if let Ok(v) = num.trim().parse::<f64>() {
                return Ok(v * scale);
            }
        }
    }
    Err(MetricsError::Parse {
        what: "memory size",
        input: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_suffixes() {
        assert_eq!(parse_memory("512B").unwrap(), 512.0);
        assert_eq!(parse_memory("2KiB").unwrap(), 2048.0);
        assert_eq!(parse_memory("1.5MiB").unwrap(), 1.5 * MB);
        assert_eq!(parse_memory(" 3.7GiB ").unwrap(), 3.7 * GB);
        assert_eq!(parse_memory("10MB").unwrap(), 10e6);
        assert!(parse_memory("lots").is_err());
    }

    #[test]
    fn percent_strips_sign() {
        assert_eq!(parse_percent("0.15%").unwrap(), 0.15);
        assert_eq!(parse_percent("100%").unwrap(), 100.0);
        assert!(parse_percent("--").is_err());
    }

    #[test]
    fn stats_lines_are_parsed() {
        let out = concat!(
            r#"{"BlockIO":"0B / 0B","CPUPerc":"1.25%","Container":"a1","ID":"a1","MemPerc":"0.5%","MemUsage":"20MiB / 3.7GiB","Name":"web","NetIO":"1kB / 0B","PIDs":"7"}"#,
            "\n",
            r#"{"CPUPerc":"0.75%","MemUsage":"12MiB / 3.7GiB","PIDs":"3"}"#,
            "\n"
        );
        let stats = parse_stats(out).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].cpu_percent, 1.25);
        assert_eq!(stats[0].mem_used, 20.0 * MB);
        assert_eq!(stats[1].pids, 3);

        let totals = crate::metrics::ContainerTotals::sum(&stats).unwrap();
        assert_eq!(totals.cpu_percent, 2.0);
        assert_eq!(totals.mem_used, 32.0 * MB);
        assert_eq!(totals.mem_limit, 3.7 * GB);
        assert_eq!(totals.pids, 10);
    }

    #[test]
    fn malformed_stats_are_errors() {
        assert!(matches!(
            parse_stats("not json"),
            Err(MetricsError::Parse { what: "container stats", .. })
        ));
        assert!(matches!(
            parse_stats(r#"{"CPUPerc":"1%","MemUsage":"20MiB","PIDs":"1"}"#),
            Err(MetricsError::Parse { what: "memory usage", .. })
        ));
    }

    #[test]
    fn states_ignore_blank_lines() {
        let overview = ContainerOverview {
            active: true,
            states: parse_states("running\nexited\n\nrunning\n"),
        };
        assert_eq!(overview.running(), 2);
        assert_eq!(overview.total(), 3);
    }
}
