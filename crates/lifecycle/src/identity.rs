use shared::{DeviceIdentity, LampError, StoredIdentity};
use tracing::debug;

/// Merges command-line identity with the persisted one, field by field.
///
/// A value given on the command line wins; otherwise the stored value is used.
pub fn reconcile_identity(
    cli_id: Option<String>,
    cli_port: Option<String>,
    stored: StoredIdentity,
) -> Result<DeviceIdentity, LampError> {
    let id = pick("id", cli_id, stored.id);
    let port = pick("port", cli_port, stored.port);

    match (id, port) {
        (Some(id), Some(port)) => DeviceIdentity::new(id, port),
        _ => Err(LampError::Usage(
            "provide --id and --port explicitly or run calibration first".into(),
        )),
    }
}

fn pick(field: &'static str, cli: Option<String>, stored: Option<String>) -> Option<String> {
    let cli = cli.filter(|v| !v.trim().is_empty());
    if cli.is_none() && stored.is_some() {
        debug!(field, "using stored value");
    }
    cli.or(stored).filter(|v| !v.trim().is_empty())
}
