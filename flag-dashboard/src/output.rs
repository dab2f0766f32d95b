use colored::Colorize;
use flag_overrides::dates::{format_last_modified, format_uptime};
use flag_overrides::flag::FeatureFlag;
use flag_overrides::sync::Snapshot;

const NAME_WIDTH: usize = 32;

pub fn status(flag: &FeatureFlag) -> &'static str {
    if flag.killed {
        "killed"
    } else if flag.active {
        "active"
    } else {
        "archived"
    }
}

fn colored_status(flag: &FeatureFlag) -> String {
    let padded = format!("{:<8}", status(flag));
    if flag.killed {
        padded.red().bold().to_string()
    } else if flag.active {
        padded.green().to_string()
    } else {
        padded.dimmed().to_string()
    }
}

/// Treatments with the default one highlighted.
fn treatments(flag: &FeatureFlag) -> String {
    if flag.treatments.is_empty() {
        return "-".dimmed().to_string();
    }

    flag.treatments
        .iter()
        .map(|t| {
            if *t == flag.default_treatment {
                t.bold().underline().to_string()
            } else {
                t.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One row of `list` output.
pub fn flag_line(flag: &FeatureFlag) -> String {
    let marker = if flag.is_overridden {
        "*".yellow().bold().to_string()
    } else {
        " ".to_string()
    };

    format!(
        "{marker} {} {} {}  {}",
        format!("{:<NAME_WIDTH$}", flag.name).bold(),
        colored_status(flag),
        treatments(flag),
        format_last_modified(&flag.cn).dimmed()
    )
}

pub fn flag_details(flag: &FeatureFlag) -> String {
    let flag_sets = if flag.flag_sets.is_empty() {
        "-".to_string()
    } else {
        flag.flag_sets.join(", ")
    };
    let overridden = if flag.is_overridden {
        "yes".yellow().to_string()
    } else {
        "no".to_string()
    };

    [
        format!("Name:               {}", flag.name.bold()),
        format!("Status:             {}", colored_status(flag).trim_end()),
        format!("Default treatment:  {}", flag.default_treatment),
        format!("Treatments:         {}", treatments(flag)),
        format!("Flag sets:          {flag_sets}"),
        format!("Last modified:      {}", format_last_modified(&flag.cn)),
        format!("Change number:      {}", flag.change_number),
        format!("Overridden:         {overridden}"),
    ]
    .join("\n")
}

pub fn summary(snapshot: &Snapshot, shown: usize) -> String {
    format!(
        "{shown} of {} feature flag{} shown, {} overridden. Synchronizer up {}.",
        snapshot.flags.len(),
        if snapshot.flags.len() == 1 { "" } else { "s" },
        snapshot.overridden_count(),
        format_uptime(snapshot.counters.uptime)
    )
}
