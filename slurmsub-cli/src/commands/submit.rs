//! Array submission from a command list (`submit` subcommand)
//!
//! Reads shell commands, one per line, writes them into a generated array
//! batch script, and submits that script. With `--wait` the job is then
//! watched to completion the same way `run` does it.

use anyhow::{Context, Result, bail};
use clap::Args;
use slurmsub_client::{SchedulerClient, SlurmClient};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commands::report_outcome;
use crate::script::{self, BatchScript};
use crate::watch::{WatchArgs, watch_job};

/// Arguments for `submit`
#[derive(Args)]
pub struct SubmitArgs {
    /// Input file with one command per line; `-` or nothing reads stdin
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Input file, alternative to the positional form
    #[arg(short = 'i', long = "input", value_name = "FILE", conflicts_with = "input")]
    pub input_file: Option<PathBuf>,

    /// Name for the script and the submission (default: input file basename)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Number of CPUs to assign per task
    #[arg(short, long, default_value_t = 1)]
    pub cpus: u32,

    /// Memory per task in MB (default: 6144 per CPU)
    #[arg(short, long)]
    pub mem: Option<u32>,

    /// Queue (partition) to submit to
    #[arg(short, long, visible_alias = "partition", default_value = "global")]
    pub queue: String,

    /// Task niceness; above 50 is low priority, 0-49 high
    #[arg(short = 'p', long, visible_alias = "priority", default_value_t = 50)]
    pub nice: i32,

    /// Hold until these jobs (comma-separated ids) complete successfully,
    /// or a full dependency string passed through as-is
    #[arg(long)]
    pub hold: Option<String>,

    /// Limit how many tasks may run at once
    #[arg(long)]
    pub max_running: Option<u32>,

    /// Directory for per-task stdout/stderr files
    #[arg(short, long, default_value = "slurm_output")]
    pub stdout_dir: PathBuf,

    /// Don't e-mail when jobs complete or fail
    #[arg(long)]
    pub no_email: bool,

    /// Commands to run before each task
    #[arg(short, long)]
    pub begin: Option<String>,

    /// Commands to run after each task
    #[arg(short, long = "final")]
    pub final_cmd: Option<String>,

    /// Write the script and print the submission command without submitting
    #[arg(long)]
    pub no_submit: bool,

    /// Watch the job to completion and exit with its aggregate code
    #[arg(short, long)]
    pub wait: bool,

    #[command(flatten)]
    pub watch: WatchArgs,
}

/// Build, write and submit the array script
pub async fn handle_submit(args: SubmitArgs) -> Result<u8> {
    let input = args.input_file.as_deref().or(args.input.as_deref());

    let (commands, default_name) = match input {
        Some(path) if path.as_os_str() != "-" => {
            info!(path = %path.display(), "reading commands");
            let file = File::open(path)
                .with_context(|| format!("cannot open command list {}", path.display()))?;
            (read_commands(BufReader::new(file))?, name_from_path(path))
        }
        _ => {
            let stdin = std::io::stdin();
            if stdin.is_terminal() {
                info!("type commands, one per line; Ctrl-D ends input");
            } else {
                info!("reading commands from stdin");
            }
            (read_commands(stdin.lock())?, "slurmsub_stdin".to_string())
        }
    };

    if commands.is_empty() {
        bail!("no commands supplied");
    }

    let job_name = tidy_name(args.name.clone().unwrap_or(default_name));
    let script = BatchScript {
        job_name: job_name.clone(),
        commands,
        cpus: args.cpus,
        mem_mb: args.mem,
        stdout_dir: args.stdout_dir.clone(),
        hold: args.hold.clone(),
        email: !args.no_email,
        max_running: args.max_running,
        prologue: args.begin.clone(),
        epilogue: args.final_cmd.clone(),
    };
    let text = script.render()?;
    let script_path = script::write_unique(Path::new("."), &format!("{job_name}.sbatch"), &text)
        .context("cannot write the batch script")?;
    info!(
        count = script.commands.len(),
        script = %script_path.display(),
        "commands written"
    );

    // Partition and niceness are submission arguments, not script
    // directives.
    let client = SlurmClient::new();
    let submit_args = vec![
        "-p".to_string(),
        args.queue.clone(),
        format!("--nice={}", args.nice),
        script_path.display().to_string(),
    ];

    if args.no_submit {
        println!(
            "mkdir -p {} ; {} {}",
            args.stdout_dir.display(),
            client.submit_command(),
            submit_args.join(" ")
        );
        return Ok(0);
    }

    // The scheduler will not create the output directory itself.
    fs::create_dir_all(&args.stdout_dir).with_context(|| {
        format!("cannot create output directory {}", args.stdout_dir.display())
    })?;

    let job_id = client.submit(&submit_args).await?;

    if args.wait {
        info!(job_id, "submission accepted, watching for completion");
        let code = watch_job(&client, job_id, &args.watch.to_config()).await?;
        report_outcome(job_id, code);
        Ok(code)
    } else {
        info!(job_id, "submission accepted");
        Ok(0)
    }
}

/// Reads the command list: blank lines and comments are skipped, a lone `.`
/// ends input early, and batch-script input is rejected outright.
fn read_commands(reader: impl BufRead) -> Result<Vec<String>> {
    let mut commands = Vec::new();
    for line in reader.lines() {
        let line = line.context("cannot read command list")?;
        let line = line.trim();
        if line.starts_with("#SBATCH ") || line.starts_with("#$ -") {
            bail!("input looks like a SLURM or SGE batch script, not a command list");
        }
        if line == "." {
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        commands.push(line.to_string());
    }
    Ok(commands)
}

/// Default job name from the input file: basename, minus a `.sh` suffix.
fn name_from_path(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.strip_suffix(".sh").unwrap_or(&base).to_string()
}

/// Corner cases on job names: empty or dot-leading names get a prefix so
/// the script file is visible and the scheduler accepts the name.
fn tidy_name(name: String) -> String {
    if name.is_empty() || name.starts_with('.') {
        format!("slurmsub{name}")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_commands_skipping_noise() {
        let input = "echo one\n\n# a comment\necho two\n";
        let commands = read_commands(Cursor::new(input)).unwrap();
        assert_eq!(commands, vec!["echo one", "echo two"]);
    }

    #[test]
    fn a_lone_dot_ends_input() {
        let input = "echo one\n.\necho never\n";
        let commands = read_commands(Cursor::new(input)).unwrap();
        assert_eq!(commands, vec!["echo one"]);
    }

    #[test]
    fn rejects_slurm_batch_input() {
        let input = "#SBATCH -a 0-4\necho one\n";
        assert!(read_commands(Cursor::new(input)).is_err());
    }

    #[test]
    fn rejects_sge_batch_input() {
        let input = "#$ -cwd\necho one\n";
        assert!(read_commands(Cursor::new(input)).is_err());
    }

    #[test]
    fn name_comes_from_the_file_basename() {
        assert_eq!(name_from_path(Path::new("jobs/align.sh")), "align");
        assert_eq!(name_from_path(Path::new("align.txt")), "align.txt");
    }

    #[test]
    fn awkward_names_get_prefixed() {
        assert_eq!(tidy_name(String::new()), "slurmsub");
        assert_eq!(tidy_name(".hidden".to_string()), "slurmsub.hidden");
        assert_eq!(tidy_name("align".to_string()), "align");
    }
}
