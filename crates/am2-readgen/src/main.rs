//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "cli"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Reading generator for authoring and checking rig sessions."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use am2_common::{init_tracing, AppConfig};
use am2_readings::{
    io::{load_catalog, load_requests_from_json},
    reports::ReadingReport, CircuitCatalog, CircuitSpecification, NoiseSource,
    ReadingEngine, TestReading, TestRequest, Variation,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;

const CONFIG_CANDIDATES: &[&str] = &["configs/am2-rig.toml", "am2-rig.toml"];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generate simulated multifunction-tester readings for AM2 rig circuits",
    long_about = None
)]
struct Cli {
    /// Circuit definitions (JSON or YAML list)
    #[arg(long, value_name = "FILE")]
    circuits: Option<PathBuf>,

    /// Configuration file; falls back to AM2_RIG_CONFIG, then configs/am2-rig.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Restrict output to one circuit id
    #[arg(long)]
    circuit: Option<String>,

    /// Test type selector (continuity, insulation, zs, rcd, pfc). Whole schedules when omitted.
    #[arg(long)]
    test: Option<String>,

    /// Sub-test selector, e.g. r1r2, live_earth, test_button
    #[arg(long)]
    sub_test: Option<String>,

    /// Recorded UI requests (JSON list) replayed against the circuit file
    #[arg(long, value_name = "FILE", conflicts_with_all = ["circuit", "test", "sub_test"])]
    requests: Option<PathBuf>,

    /// Test point recorded on each reading
    #[arg(long, default_value = "db")]
    test_point: String,

    /// Repetitions per circuit
    #[arg(long, default_value_t = 1)]
    samples: u32,

    /// Random seed; overrides simulation.random_seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output file path. Use '-' for stdout.
    #[arg(long, default_value = "readings.json")]
    output: PathBuf,

    /// Explicit output format when extension is ambiguous
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Serve the reading API on this address instead of generating a file
    #[cfg(feature = "serve")]
    #[arg(long, value_name = "ADDR")]
    serve: Option<std::net::SocketAddr>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing("am2-readgen", &config.logging)?;
    let engine = ReadingEngine::from_config(config.engine.clone())
        .context("failed to build reading engine")?;

    #[cfg(feature = "serve")]
    {
        if let Some(addr) = cli.serve {
            return serve(addr, engine);
        }
    }

    if cli.samples == 0 {
        return Err(anyhow!("samples must be greater than zero"));
    }
    let circuits = cli
        .circuits
        .as_ref()
        .context("--circuits is required when generating readings")?;
    let catalog = load_catalog(circuits)
        .with_context(|| format!("failed to load circuits from {}", circuits.display()))?;
    let format = determine_format(&cli.output, cli.format);
    let seed = cli.seed.or(config.simulation.random_seed);
    let mut source = NoiseSource::new(config.simulation.noise, seed);

    let readings = collect_readings(&cli, &engine, &catalog, &mut source)?;
    let count = readings.len();
    match format {
        OutputFormat::Csv => write_csv(open_output(&cli.output)?, &readings)?,
        OutputFormat::Json => {
            let report = ReadingReport::new(&engine, seed, readings);
            if is_stdout(&cli.output) {
                let mut stdout = io::stdout().lock();
                report.write_to(&mut stdout)?;
                stdout.write_all(b"\n")?;
            } else {
                report.export(&cli.output)?;
            }
        }
    }

    if !is_stdout(&cli.output) {
        eprintln!(
            "generated {} readings for {} circuit(s) -> {}",
            count,
            cli.circuit.as_ref().map_or(catalog.len(), |_| 1),
            cli.output.display()
        );
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    if let Some(path) = &cli.config {
        return AppConfig::from_path(path);
    }
    let loaded = AppConfig::load_with_source(CONFIG_CANDIDATES)?;
    if let Some(source) = &loaded.source {
        eprintln!("using configuration {}", source.display());
    }
    Ok(loaded.config)
}

fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn determine_format(path: &Path, override_format: Option<OutputFormat>) -> OutputFormat {
    if let Some(format) = override_format {
        return format;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => OutputFormat::Csv,
        _ => OutputFormat::Json,
    }
}

fn selected_circuits<'a>(
    cli: &Cli,
    catalog: &'a CircuitCatalog,
) -> Result<Vec<&'a CircuitSpecification>> {
    match &cli.circuit {
        Some(id) => Ok(vec![catalog.get(id)?]),
        None if catalog.is_empty() => Err(anyhow!("circuit file contains no circuits")),
        None => Ok(catalog.iter().collect()),
    }
}

fn collect_readings<V: Variation>(
    cli: &Cli,
    engine: &ReadingEngine,
    catalog: &CircuitCatalog,
    source: &mut V,
) -> Result<Vec<TestReading>> {
    if let Some(path) = &cli.requests {
        let requests = load_requests_from_json(path)
            .with_context(|| format!("failed to load requests from {}", path.display()))?;
        return replay_requests(cli.samples, engine, catalog, &requests, source);
    }
    let circuits = selected_circuits(cli, catalog)?;
    let mut readings = Vec::new();
    for _ in 0..cli.samples {
        for circuit in &circuits {
            match &cli.test {
                Some(test) => {
                    let request = TestRequest::new(
                        circuit.id.as_str(),
                        cli.test_point.as_str(),
                        test.as_str(),
                        cli.sub_test.as_deref(),
                    );
                    readings.push(engine.take_reading(circuit, &request, source)?);
                }
                None => readings.extend(engine.take_schedule(circuit, &cli.test_point, source)?),
            }
        }
    }
    info!(readings = readings.len(), "readings generated");
    Ok(readings)
}

fn replay_requests<V: Variation>(
    samples: u32,
    engine: &ReadingEngine,
    catalog: &CircuitCatalog,
    requests: &[TestRequest],
    source: &mut V,
) -> Result<Vec<TestReading>> {
    let mut readings = Vec::with_capacity(requests.len() * samples as usize);
    for _ in 0..samples {
        for request in requests {
            readings.push(engine.take_catalog_reading(catalog, request, source)?);
        }
    }
    info!(
        requests = requests.len(),
        readings = readings.len(),
        "recorded requests replayed"
    );
    Ok(readings)
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: String,
    circuit_id: &'a str,
    test_point_id: &'a str,
    test_type: &'static str,
    sub_test: &'a str,
    value: f64,
    display_value: &'a str,
    unit: &'static str,
    compliant: bool,
    timestamp: String,
    eic_columns: String,
}

impl<'a> From<&'a TestReading> for CsvRow<'a> {
    fn from(reading: &'a TestReading) -> Self {
        Self {
            id: reading.id().to_string(),
            circuit_id: reading.circuit_id(),
            test_point_id: reading.test_point_id(),
            test_type: reading.test_type().as_str(),
            sub_test: reading.sub_test().unwrap_or(""),
            value: reading.value(),
            display_value: reading.display_value(),
            unit: reading.unit().symbol(),
            compliant: reading.compliant(),
            timestamp: reading.timestamp().to_rfc3339(),
            eic_columns: reading
                .eic_columns()
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if is_stdout(path) {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    Ok(Box::new(file))
}

fn write_csv<W: Write>(writer: W, readings: &[TestReading]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for reading in readings {
        writer.serialize(CsvRow::from(reading))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(feature = "serve")]
fn serve(addr: std::net::SocketAddr, engine: ReadingEngine) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "reading API listening");
        axum::serve(listener, am2_readings::api::router(engine)).await?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use am2_readings::{BoxMuller, DeviceCurve, ProtectiveDevice};
    use std::path::Path;

    fn base_cli() -> Cli {
        Cli {
            circuits: None,
            config: None,
            circuit: None,
            test: None,
            sub_test: None,
            requests: None,
            test_point: "db".into(),
            samples: 1,
            seed: None,
            output: PathBuf::from("out.json"),
            format: None,
            #[cfg(feature = "serve")]
            serve: None,
        }
    }

    fn radial(id: &str) -> CircuitSpecification {
        CircuitSpecification {
            id: id.into(),
            description: None,
            ze_ohm: Some(0.35),
            r1_plus_r2_ohm: Some(0.64),
            ring: None,
            zs_ohm: None,
            insulation_baseline_mohm: Some(120.0),
            rcd_trip_time_ms: Some(24.0),
            pfc_ka: Some(1.2),
            device: ProtectiveDevice {
                curve: DeviceCurve::B,
                rating_a: 20,
                max_zs_ohm: None,
                breaking_capacity_ka: Some(6.0),
            },
        }
    }

    fn catalog() -> CircuitCatalog {
        CircuitCatalog::new([radial("radial-1"), radial("radial-2")])
    }

    #[test]
    fn determine_format_defaults_json() {
        assert!(matches!(
            determine_format(Path::new("readings.data"), None),
            OutputFormat::Json
        ));
        assert!(matches!(determine_format(Path::new("-"), None), OutputFormat::Json));
    }

    #[test]
    fn determine_format_follows_extension_and_override() {
        assert!(matches!(
            determine_format(Path::new("readings.csv"), None),
            OutputFormat::Csv
        ));
        assert!(matches!(
            determine_format(Path::new("readings.csv"), Some(OutputFormat::Json)),
            OutputFormat::Json
        ));
    }

    #[test]
    fn schedules_cover_every_circuit_per_sample() {
        let mut cli = base_cli();
        cli.samples = 2;
        let engine = ReadingEngine::default();
        let readings =
            collect_readings(&cli, &engine, &catalog(), &mut BoxMuller::seeded(1)).unwrap();
        assert_eq!(readings.len(), 2 * 2 * 8);
    }

    #[test]
    fn single_test_for_one_circuit() {
        let mut cli = base_cli();
        cli.circuit = Some("radial-2".into());
        cli.test = Some("rcd".into());
        cli.sub_test = Some("test_button".into());
        cli.samples = 3;
        let engine = ReadingEngine::default();
        let readings =
            collect_readings(&cli, &engine, &catalog(), &mut BoxMuller::seeded(1)).unwrap();
        assert_eq!(readings.len(), 3);
        assert!(readings
            .iter()
            .all(|r| r.circuit_id() == "radial-2" && r.display_value() == "PASS"));
    }

    #[test]
    fn unknown_circuit_is_an_error() {
        let mut cli = base_cli();
        cli.circuit = Some("cooker".into());
        let engine = ReadingEngine::default();
        assert!(collect_readings(&cli, &engine, &catalog(), &mut BoxMuller::seeded(1)).is_err());
    }

    #[test]
    fn recorded_requests_are_replayed_in_order() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        serde_json::to_writer(
            file.as_file_mut(),
            &vec![
                TestRequest::new("radial-2", "socket-1", "zs", None),
                TestRequest::new("radial-1", "db", "rcd", Some("test_button")),
            ],
        )
        .unwrap();
        file.flush().unwrap();

        let mut cli = base_cli();
        cli.requests = Some(file.path().to_path_buf());
        cli.samples = 2;
        let engine = ReadingEngine::default();
        let readings =
            collect_readings(&cli, &engine, &catalog(), &mut BoxMuller::seeded(2)).unwrap();
        let ids: Vec<&str> = readings.iter().map(|r| r.circuit_id()).collect();
        assert_eq!(ids, ["radial-2", "radial-1", "radial-2", "radial-1"]);
        assert_eq!(readings[0].test_point_id(), "socket-1");
        assert_eq!(readings[1].display_value(), "PASS");
    }

    #[test]
    fn replay_rejects_unknown_circuit() {
        let requests = [TestRequest::new("cooker", "db", "zs", None)];
        let engine = ReadingEngine::default();
        let err = replay_requests(1, &engine, &catalog(), &requests, &mut BoxMuller::seeded(2))
            .unwrap_err();
        assert!(err.to_string().contains("cooker"));
    }

    #[test]
    fn csv_rows_join_columns() {
        let mut cli = base_cli();
        cli.test = Some("insulation".into());
        let engine = ReadingEngine::default();
        let readings =
            collect_readings(&cli, &engine, &catalog(), &mut BoxMuller::seeded(4)).unwrap();

        let mut buffer = Vec::new();
        write_csv(&mut buffer, &readings).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,circuit_id,test_point_id"));
        let row = lines.next().unwrap();
        assert!(row.contains(",insulation_resistance,"));
        assert!(row.ends_with("21;22"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let mut cli = base_cli();
        cli.config = Some(PathBuf::from("does/not/exist.toml"));
        assert!(load_config(&cli).is_err());
    }
}
