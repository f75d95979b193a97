use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};

use buswatch_filter::StageKind;
use buswatch_frame::{crc16, Command, Frame, FrameError, FramingPolicy};
use buswatch_pipeline::{EventSink, PipelineStats, SnifferEvent};
use buswatch_source::Micros;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Space-separated upper-case hex, e.g. `AA 07 00`.
pub fn hex_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

#[derive(Serialize)]
struct EventOutput {
    kind: &'static str,
    at_us: Micros,
    len: usize,
    bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    closed_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostic: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    novel: bool,
}

impl EventOutput {
    fn new(event: &SnifferEvent) -> Self {
        let bytes = event.bytes().unwrap_or_default();
        let mut out = Self {
            kind: event.kind(),
            at_us: event.at(),
            len: bytes.len(),
            bytes: hex_bytes(&bytes),
            closed_by: None,
            command: None,
            diagnostic: None,
            message: None,
            novel: event.is_novel(),
        };
        match event {
            SnifferEvent::Burst { burst, .. } => out.closed_by = Some(burst.closed_by.as_str()),
            SnifferEvent::Frame { command, .. } => out.command = Some(command.to_string()),
            SnifferEvent::Diagnostic { error, .. } => {
                out.diagnostic = Some(error.kind());
                out.message = Some(error.to_string());
            }
        }
        out
    }

    fn detail(&self) -> String {
        if let Some(command) = &self.command {
            return command.clone();
        }
        if let Some(message) = &self.message {
            return message.clone();
        }
        self.closed_by.unwrap_or_default().to_string()
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.at_us.to_string(),
            self.kind.to_string(),
            self.len.to_string(),
            self.bytes.clone(),
            self.detail(),
            if self.novel { "yes" } else { "" }.to_string(),
        ]
    }
}

/// Prints events as they are emitted.
///
/// In table mode rows are collected and printed by [`EventPrinter::flush`].
pub struct EventPrinter {
    format: OutputFormat,
    rows: Vec<Vec<String>>,
}

impl EventPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            rows: Vec::new(),
        }
    }

    /// Printer for a capture that never ends. Flushing after every poll
    /// would print one table per poll, so table output becomes one line per
    /// event.
    pub fn streaming(format: OutputFormat) -> Self {
        let format = match format {
            OutputFormat::Table => {
                tracing::debug!("live capture prints pretty lines instead of tables");
                OutputFormat::Pretty
            }
            other => other,
        };
        Self::new(format)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn flush(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["TIME (us)", "KIND", "LEN", "BYTES", "DETAIL", "NEW"]);
        for row in self.rows.drain(..) {
            table.add_row(row);
        }
        println!("{table}");
        let _ = std::io::stdout().flush();
    }
}

impl EventSink for EventPrinter {
    fn emit(&mut self, event: SnifferEvent) {
        let out = EventOutput::new(&event);
        match self.format {
            OutputFormat::Json => print_json(&out),
            OutputFormat::Table => self.rows.push(out.row()),
            OutputFormat::Pretty => {
                let marker = if out.novel { " *" } else { "" };
                println!(
                    "{:>10} {:<10} [{:>3}] {} | {}{}",
                    out.at_us,
                    out.kind,
                    out.len,
                    out.bytes,
                    out.detail(),
                    marker
                );
            }
        }
    }
}

#[derive(Serialize)]
struct StatsOutput {
    kind: &'static str,
    bytes: u64,
    bursts: u64,
    forced_closes: u64,
    frames: u64,
    crc_errors: u64,
    unsynchronized: u64,
    overflows: u64,
    truncated: u64,
    invalid_length: u64,
    emitted: u64,
    evaluated: u64,
    novel: u64,
    suppressed: BTreeMap<&'static str, u64>,
}

impl StatsOutput {
    fn new(stats: &PipelineStats) -> Self {
        Self {
            kind: "stats",
            bytes: stats.bytes,
            bursts: stats.bursts,
            forced_closes: stats.forced_closes,
            frames: stats.frames,
            crc_errors: stats.crc_errors,
            unsynchronized: stats.unsynchronized,
            overflows: stats.overflows,
            truncated: stats.truncated,
            invalid_length: stats.invalid_length,
            emitted: stats.emitted,
            evaluated: stats.filter.evaluated,
            novel: stats.filter.novel,
            suppressed: StageKind::ALL
                .iter()
                .map(|kind| (kind.as_str(), stats.filter.suppressed_by(*kind)))
                .collect(),
        }
    }

    fn rows(&self) -> Vec<(String, u64)> {
        let mut rows = vec![
            ("bytes".to_string(), self.bytes),
            ("bursts".to_string(), self.bursts),
            ("forced_closes".to_string(), self.forced_closes),
            ("frames".to_string(), self.frames),
            ("crc_errors".to_string(), self.crc_errors),
            ("unsynchronized".to_string(), self.unsynchronized),
            ("overflows".to_string(), self.overflows),
            ("truncated".to_string(), self.truncated),
            ("invalid_length".to_string(), self.invalid_length),
            ("emitted".to_string(), self.emitted),
            ("evaluated".to_string(), self.evaluated),
            ("novel".to_string(), self.novel),
        ];
        rows.extend(
            self.suppressed
                .iter()
                .map(|(stage, n)| (format!("suppressed.{stage}"), *n)),
        );
        rows
    }
}

pub fn print_stats(stats: &PipelineStats, format: OutputFormat) {
    let out = StatsOutput::new(stats);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in out.rows() {
                table.add_row(vec![name, value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (name, value) in out.rows() {
                println!("{name}: {value}");
            }
        }
    }
}

#[derive(Serialize)]
pub struct DecodeOutput {
    pub bytes: String,
    pub len: usize,
    pub policy: &'static str,
    pub valid: bool,
    /// Declared length agrees with the byte count under `policy`.
    pub length_matches: bool,
    pub crc_received: String,
    pub crc_computed: String,
    pub address: Option<String>,
    pub command_code: Option<String>,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecodeOutput {
    pub fn from_result(
        raw: &[u8],
        policy: FramingPolicy,
        result: &Result<Frame, FrameError>,
    ) -> Self {
        let command = Command::decode(raw);
        let computed = crc16(&raw[..raw.len().saturating_sub(2)]);
        let received = match raw {
            [.., lo, hi] => u16::from_le_bytes([*lo, *hi]),
            _ => 0,
        };
        Self {
            bytes: hex_bytes(raw),
            len: raw.len(),
            policy: policy.as_str(),
            valid: result.is_ok(),
            length_matches: raw.len() > 1 && policy.total_len(raw[1]) == raw.len(),
            crc_received: format!("0x{received:04X}"),
            crc_computed: format!("0x{computed:04X}"),
            address: raw.get(2..4).map(hex_bytes),
            command_code: command.code().map(|c| format!("0x{c:02X}")),
            command: command.to_string(),
            error: result.as_ref().err().map(|e| e.to_string()),
        }
    }
}

pub fn print_decode(out: &DecodeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BYTES", "LEN", "CRC", "COMMAND"])
                .add_row(vec![
                    out.bytes.clone(),
                    out.len.to_string(),
                    crc_summary(out),
                    out.command.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} -> {} ({})", out.bytes, out.command, crc_summary(out));
            if !out.length_matches {
                println!("note: declared length does not match {} framing", out.policy);
            }
        }
    }
}

fn crc_summary(out: &DecodeOutput) -> String {
    if out.valid {
        format!("ok {}", out.crc_received)
    } else {
        format!("bad {} != {}", out.crc_received, out.crc_computed)
    }
}

#[derive(Serialize)]
struct EncodeOutput<'a> {
    bytes: String,
    len: usize,
    policy: &'a str,
}

pub fn print_encoded(frame: &[u8], policy: &str, format: OutputFormat) {
    let out = EncodeOutput {
        bytes: hex_bytes(frame),
        len: frame.len(),
        policy,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BYTES", "LEN", "FRAMING"])
                .add_row(vec![out.bytes, out.len.to_string(), policy.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.bytes),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use buswatch_pipeline::{Burst, CloseReason};
    use bytes::Bytes;

    use super::*;

    #[test]
    fn hex_rendering() {
        assert_eq!(hex_bytes(&[0xAA, 0x07, 0x00]), "AA 07 00");
        assert_eq!(hex_bytes(&[]), "");
    }

    #[test]
    fn live_capture_never_batches_tables() {
        assert_eq!(
            EventPrinter::streaming(OutputFormat::Table).format(),
            OutputFormat::Pretty
        );
        assert_eq!(
            EventPrinter::streaming(OutputFormat::Json).format(),
            OutputFormat::Json
        );
        assert_eq!(
            EventPrinter::new(OutputFormat::Table).format(),
            OutputFormat::Table
        );
    }

    #[test]
    fn burst_event_output() {
        let event = SnifferEvent::Burst {
            burst: Burst {
                bytes: Bytes::from_static(&[0x01, 0xFE]),
                start_us: 10,
                end_us: 20,
                closed_by: CloseReason::IdleGap,
            },
            novel: true,
        };
        let out = EventOutput::new(&event);
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"kind\":\"burst\""));
        assert!(json.contains("\"bytes\":\"01 FE\""));
        assert!(json.contains("\"closed_by\":\"idle_gap\""));
        assert!(!json.contains("command"));
        assert_eq!(out.row()[5], "yes");
    }

    #[test]
    fn diagnostic_event_output() {
        let event = SnifferEvent::Diagnostic {
            error: FrameError::Unsynchronized {
                noise: Bytes::from_static(&[0x55; 17]),
            },
            at: 99,
        };
        let out = EventOutput::new(&event);
        assert_eq!(out.diagnostic, Some("unsynchronized"));
        assert_eq!(out.len, 17);
        assert!(out.detail().contains("unsynchronized"));
    }

    #[test]
    fn stats_rows_cover_every_stage() {
        let out = StatsOutput::new(&PipelineStats::default());
        let rows = out.rows();
        assert!(rows
            .iter()
            .any(|(name, _)| name == "suppressed.chatter_window"));
        assert_eq!(rows.len(), 12 + StageKind::ALL.len());
    }
}
