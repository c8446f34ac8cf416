//! Batch script generation
//!
//! Turns a list of shell commands into a SLURM array script: one array
//! task per command, dispatched through a `case` on the task id. The
//! script lands in the current directory so the user can inspect or
//! resubmit it by hand.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{self, ErrorKind, Write as _};
use std::path::{Path, PathBuf};

/// Default memory per task when `--mem` is not given, scaled by cpu count.
pub const DEFAULT_MEM_PER_CPU_MB: u32 = 6144;

/// Everything needed to render one array script.
#[derive(Debug, Clone)]
pub struct BatchScript {
    pub job_name: String,
    pub commands: Vec<String>,
    pub cpus: u32,
    pub mem_mb: Option<u32>,
    pub stdout_dir: PathBuf,
    pub hold: Option<String>,
    pub email: bool,
    pub max_running: Option<u32>,
    pub prologue: Option<String>,
    pub epilogue: Option<String>,
}

impl BatchScript {
    /// Renders the full script text.
    pub fn render(&self) -> Result<String> {
        let mut array = format!("0-{}", self.commands.len().saturating_sub(1));
        if let Some(max) = self.max_running {
            array.push_str(&format!("%{max}"));
        }
        let mem = self.mem_mb.unwrap_or(DEFAULT_MEM_PER_CPU_MB * self.cpus);
        let dir = self.stdout_dir.display();
        let name = &self.job_name;

        let mut lines: Vec<String> = Vec::new();
        lines.push("#!/bin/bash".to_string());
        lines.push("#".to_string());
        lines.push(format!(
            "#SBATCH -a {array:<17}   # task array, optionally capped with %N"
        ));
        lines.push("#SBATCH -n 1                   # one task per node".to_string());
        lines.push(format!("#SBATCH -c {:<15}     # cores per task", self.cpus));
        lines.push(format!(
            "#SBATCH --mem {:<15}  # memory per task in MB (not per core)",
            mem
        ));
        lines.push(format!("#SBATCH -o {dir}/{name}.%A.%a.out     # STDOUT"));
        lines.push(format!("#SBATCH -e {dir}/{name}.%A.%a.err     # STDERR"));
        if let Some(hold) = &self.hold {
            let dependency = munge_hold(hold)?;
            lines.push(format!("#SBATCH -d {dependency}  # wait for these jobs first"));
        }
        if self.email {
            lines.push("#SBATCH --mail-type=END,FAIL   # notify on completion and failure".to_string());
        } else {
            lines.push("#SBATCH --mail-type=NONE       # no email".to_string());
        }

        // bash strict mode
        lines.push(String::new());
        lines.push("set -euo pipefail".to_string());
        lines.push("IFS=$'\\n\\t'".to_string());
        lines.push(String::new());

        if let Some(prologue) = &self.prologue {
            lines.push(prologue.clone());
            lines.push(String::new());
        }

        // $TASK lets a single arm be run by hand outside the scheduler
        lines.push("TASK=${TASK:-unset}".to_string());
        lines.push("case ${SLURM_ARRAY_TASK_ID:-$TASK} in".to_string());
        for (index, command) in self.commands.iter().enumerate() {
            lines.push(format!("{index}) {command}"));
            lines.push(";;".to_string());
        }
        lines.push(
            "*) echo \"Unexpected SLURM_ARRAY_TASK_ID=${SLURM_ARRAY_TASK_ID:-$TASK}\"".to_string(),
        );
        lines.push("esac".to_string());

        if let Some(epilogue) = &self.epilogue {
            lines.push(String::new());
            lines.push(epilogue.clone());
        }

        Ok(lines.join("\n") + "\n")
    }
}

/// Translates `--hold` into a scheduler dependency string.
///
/// A value already containing `:` is a full dependency string and passes
/// through verbatim; otherwise it must be a comma-separated job-id list and
/// becomes `afterok:<id>:<id>...`.
pub fn munge_hold(hold: &str) -> Result<String> {
    if hold.contains(':') {
        return Ok(hold.to_string());
    }
    let ids = hold
        .split(',')
        .map(|id| id.trim().parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("--hold expects job ids or a dependency string, got {hold:?}"))?;
    let joined = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(":");
    Ok(format!("afterok:{joined}"))
}

/// Writes `contents` to `file_name` inside `dir`, but never over an
/// existing file: on a name collision a counter is inserted before the
/// extension (`demo.sbatch`, `demo.1.sbatch`, `demo.2.sbatch`, ...).
pub fn write_unique(dir: &Path, file_name: &str, contents: &str) -> io::Result<PathBuf> {
    let mut candidate = dir.join(file_name);
    let mut counter = 0u32;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter += 1;
                candidate = dir.join(numbered_name(file_name, counter));
            }
            Err(e) => return Err(e),
        }
    }
}

fn numbered_name(file_name: &str, counter: u32) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) => format!("{stem}.{counter}.{extension}"),
        None => format!("{file_name}.{counter}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(commands: &[&str]) -> BatchScript {
        BatchScript {
            job_name: "demo".to_string(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            cpus: 1,
            mem_mb: None,
            stdout_dir: PathBuf::from("slurm_output"),
            hold: None,
            email: true,
            max_running: None,
            prologue: None,
            epilogue: None,
        }
    }

    #[test]
    fn renders_an_array_directive_per_command_count() {
        let text = script(&["echo a", "echo b", "echo c"]).render().unwrap();
        assert!(text.starts_with("#!/bin/bash\n"));
        assert!(text.contains("#SBATCH -a 0-2"));
        assert!(text.contains("0) echo a\n;;"));
        assert!(text.contains("2) echo c\n;;"));
        assert!(text.contains("case ${SLURM_ARRAY_TASK_ID:-$TASK} in"));
        assert!(text.contains("esac"));
    }

    #[test]
    fn caps_concurrency_when_asked() {
        let mut s = script(&["echo a", "echo b"]);
        s.max_running = Some(8);
        let text = s.render().unwrap();
        assert!(text.contains("#SBATCH -a 0-1%8"));
    }

    #[test]
    fn memory_defaults_scale_with_cpus() {
        let mut s = script(&["echo a"]);
        s.cpus = 4;
        let text = s.render().unwrap();
        assert!(text.contains("#SBATCH -c 4"));
        assert!(text.contains("#SBATCH --mem 24576"));

        s.mem_mb = Some(1000);
        let text = s.render().unwrap();
        assert!(text.contains("#SBATCH --mem 1000"));
    }

    #[test]
    fn email_can_be_disabled() {
        let mut s = script(&["echo a"]);
        let text = s.render().unwrap();
        assert!(text.contains("--mail-type=END,FAIL"));

        s.email = false;
        let text = s.render().unwrap();
        assert!(text.contains("--mail-type=NONE"));
    }

    #[test]
    fn prologue_and_epilogue_wrap_the_dispatch() {
        let mut s = script(&["echo a"]);
        s.prologue = Some("module load python".to_string());
        s.epilogue = Some("echo done".to_string());
        let text = s.render().unwrap();
        let prologue_at = text.find("module load python").unwrap();
        let case_at = text.find("case ${SLURM_ARRAY_TASK_ID").unwrap();
        let epilogue_at = text.find("echo done").unwrap();
        assert!(prologue_at < case_at && case_at < epilogue_at);
    }

    #[test]
    fn hold_list_becomes_afterok_dependency() {
        assert_eq!(munge_hold("1234").unwrap(), "afterok:1234");
        assert_eq!(munge_hold("1234, 99").unwrap(), "afterok:1234:99");
    }

    #[test]
    fn hold_with_colon_passes_through() {
        assert_eq!(munge_hold("aftercorr:1234").unwrap(), "aftercorr:1234");
        assert_eq!(munge_hold("afterok:1:2").unwrap(), "afterok:1:2");
    }

    #[test]
    fn hold_rejects_non_numeric_ids() {
        assert!(munge_hold("12a").is_err());
        assert!(munge_hold("").is_err());
    }

    #[test]
    fn unique_names_never_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_unique(dir.path(), "demo.sbatch", "one").unwrap();
        let second = write_unique(dir.path(), "demo.sbatch", "two").unwrap();
        let third = write_unique(dir.path(), "demo.sbatch", "three").unwrap();
        assert_eq!(first.file_name().unwrap(), "demo.sbatch");
        assert_eq!(second.file_name().unwrap(), "demo.1.sbatch");
        assert_eq!(third.file_name().unwrap(), "demo.2.sbatch");
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "two");
    }

    #[test]
    fn unique_names_without_extension_append_counter() {
        let dir = tempfile::tempdir().unwrap();
        write_unique(dir.path(), "demo", "one").unwrap();
        let second = write_unique(dir.path(), "demo", "two").unwrap();
        assert_eq!(second.file_name().unwrap(), "demo.1");
    }
}
