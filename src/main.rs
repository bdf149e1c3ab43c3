use std::env;
use std::process;

use whatsapp_dispatcher::commands::{
    export_sample_file, export_tracking_report, fetch_tracking, import_contacts_file,
    list_channels, list_templates, reencode_contacts_file, validate_contact_file, ImportResult,
    TrackingOverview,
};
use whatsapp_dispatcher::core::phone::format_whatsapp_display;
use whatsapp_dispatcher::{init, AppState, Channel, Template};

const USAGE: &str = "Usage: whatsapp-dispatcher <command> [args]

Commands:
  validate <file>              Check the header of a contact list
  import <file> [rows]         Parse a contact list and preview its contacts
  sample [dir]                 Write the sample contact list
  reencode <file> [out]        Rewrite a contact list as UTF-8 with BOM
  channels                     List sending channels
  templates [id_account]       List message templates
  tracking [report-dir]        Show delivery status, optionally writing a report";

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{USAGE}");
        process::exit(1);
    }

    let state = match AppState::new() {
        Ok(state) => state,
        Err(error) => {
            eprintln!("Error: {error}");
            process::exit(1);
        }
    };
    if let Err(error) = init(&state.config) {
        eprintln!("Error: {error}");
        process::exit(1);
    }

    if let Err(error) = run(&state, &args[1], &args[2..]).await {
        eprintln!("Error: {error}");
        process::exit(1);
    }
}

async fn run(state: &AppState, command: &str, args: &[String]) -> Result<(), String> {
    let arg = |index: usize| args.get(index).cloned();
    let required = |index: usize, name: &str| {
        arg(index).ok_or_else(|| format!("missing <{}>\n\n{}", name, USAGE))
    };

    match command {
        "validate" => {
            let file = required(0, "file")?;
            validate_contact_file(state, file.clone()).await?;
            println!("{file}: header OK");
        }
        "import" => {
            let rows = arg(1)
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(10);
            let result = import_contacts_file(state, required(0, "file")?).await?;
            print_import(&result, rows);
        }
        "sample" => {
            let path = export_sample_file(arg(0)).await?;
            println!("Sample written to {path}");
        }
        "reencode" => {
            let path = reencode_contacts_file(state, required(0, "file")?, arg(1)).await?;
            println!("Re-encoded list written to {path}");
        }
        "channels" => print_channels(&list_channels(state).await?),
        "templates" => print_templates(&list_templates(state, arg(0)).await?),
        "tracking" => {
            let overview = fetch_tracking(state, None).await?;
            print_tracking(&overview);
            if let Some(dir) = arg(0) {
                let path = export_tracking_report(&overview.records, Some(dir)).await?;
                println!("Report written to {path}");
            }
        }
        other => return Err(format!("unknown command '{}'\n\n{}", other, USAGE)),
    }

    Ok(())
}

fn print_import(result: &ImportResult, rows: usize) {
    println!("File: {} ({} bytes)", result.file_name, result.file_size);
    println!("Encoding: {}", result.encoding);
    println!(
        "Rows: {} total, {} valid, {} invalid ({} ms)",
        result.stats.total_lines,
        result.stats.valid_contacts,
        result.stats.invalid_contacts,
        result.parse_time_ms
    );

    if !result.diagnostics.is_empty() {
        println!("Diagnostics:");
        for diagnostic in &result.diagnostics {
            println!("  {diagnostic}");
        }
    }

    println!("Preview:");
    for contact in result.preview(rows) {
        println!(
            "  {} | {} | {}",
            contact.name,
            format_whatsapp_display(&contact.phone),
            contact.email.as_deref().unwrap_or("-")
        );
    }
}

fn print_channels(channels: &[Channel]) {
    println!("{} channel(s)", channels.len());
    for channel in channels {
        println!(
            "  {} [{}] status={} quality={}",
            channel.label(),
            channel.dispatch_phone_id().unwrap_or_default(),
            channel.status.as_deref().unwrap_or("-"),
            channel.quality_rating.as_deref().unwrap_or("-")
        );
    }
}

fn print_templates(templates: &[Template]) {
    println!("{} template(s)", templates.len());
    for template in templates {
        println!(
            "  {} ({}, {})",
            template.name,
            template.category.as_deref().unwrap_or("-"),
            template.status.as_deref().unwrap_or("-")
        );
    }
}

fn print_tracking(overview: &TrackingOverview) {
    let summary = &overview.summary;
    println!(
        "{} message(s): {} sent, {} pending, {} failed, {} unknown",
        summary.total(),
        summary.sent,
        summary.pending,
        summary.failed,
        summary.unknown
    );
    for record in &overview.records {
        println!(
            "  {} | {} | {} | {} | {}",
            record.name.as_deref().unwrap_or("-"),
            record
                .phone
                .as_deref()
                .map(format_whatsapp_display)
                .unwrap_or_default(),
            record.name_batch.as_deref().unwrap_or("-"),
            record.send_status,
            record.reason().unwrap_or("-")
        );
    }
}
