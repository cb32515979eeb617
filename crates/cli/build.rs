use std::{env, fs, path::PathBuf};

use ticket_report_core::LocationType;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("ticket-report")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Ticket Report Contributors")
        .about("Generate ticket status reports from work item comments")
        .arg(clap::arg!(-w --work_item <ID> "Work item ID (prompted when omitted)"))
        .arg(clap::arg!(-c --client <NAME> "Client name shown in the report"))
        .arg(
            clap::arg!(-l --location <LOCATION> "Where the work was performed")
                .value_parser(LocationType::ACCEPTED.map(|(name, _)| name)),
        )
        .arg(
            clap::arg!(-t --template <FILE> "Word template with placeholders")
                .value_name("FILE")
                .default_value("template.docx")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-o --output_dir <DIR> "Directory the report is written to")
                .value_name("DIR")
                .default_value(".")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--org_url <URL> "Tracker collection/project URL"))
        .arg(clap::arg!(--pat <TOKEN> "Personal access token"))
        .arg(clap::arg!(--display_name <NAME> "Your display name in the tracker"))
        .arg(clap::arg!(--unique_name <NAME> "Your unique name in the tracker"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"))
        .arg(
            clap::arg!(--completions <SHELL> "Generate shell completion script")
                .value_name("SHELL")
                .value_parser(["bash", "zsh", "fish", "powershell"]),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "ticket-report", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "ticket-report", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "ticket-report", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "ticket-report", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
