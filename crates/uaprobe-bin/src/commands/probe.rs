// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `probe` command.

use tracing::{info, warn};
use uaprobe_client::certificate::ClientCertificate;
use uaprobe_client::report::LineSink;
use uaprobe_client::workflow::Workflow;
use uaprobe_config::ProbeConfig;

use super::load_settings;
use crate::cli::{Cli, ProbeArgs};
use crate::error::{BinError, BinResult};

/// Executes the `probe` command.
///
/// The workflow runs on its own task. Report lines go to stdout as they
/// are produced and the command waits for the terminal state.
pub async fn probe(cli: &Cli, args: ProbeArgs) -> BinResult<()> {
    let mut config = load_settings(cli)?;
    apply_args(&mut config, args)?;

    let url = config.probe.url.clone().ok_or_else(|| {
        BinError::config("no server URL; pass one to `probe` or set probe.url")
    })?;
    let requests = config.probe.read_requests()?;

    let mut builder = Workflow::builder()
        .requests(requests)
        .timestamps(config.probe.timestamps)
        .sink(LineSink::stdout());

    if config.client.certificate_path.is_none() {
        warn!("No client certificate configured, using a self-issued one");
        builder = builder.certificate(ClientCertificate::self_issued(
            &config.client.application_uri(),
        ));
    }

    let workflow = builder.config(config.client).build()?;
    let outcome = workflow.spawn(url).wait().await?;

    info!(
        endpoint = %outcome.endpoint.endpoint_url,
        mode = %outcome.endpoint.security_mode,
        count = outcome.values.len(),
        "Probe finished"
    );
    Ok(())
}

/// Command-line values win over the configuration file.
fn apply_args(config: &mut ProbeConfig, args: ProbeArgs) -> BinResult<()> {
    if let Some(url) = args.url {
        config.probe.url = Some(url);
    }
    if !args.nodes.is_empty() {
        config.probe.nodes = args.nodes;
    }
    if let Some(timestamps) = args.timestamps {
        config.probe.timestamps = timestamps.into();
    }
    if let Some(path) = args.certificate {
        config.client.certificate_path = Some(path);
    }

    config.probe.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::TimestampsArg;
    use uaprobe_client::types::TimestampsToReturn;

    #[test]
    fn test_args_override_config() {
        let mut config = ProbeConfig::default();
        config.probe.url = Some("opc.tcp://from-file:1".into());

        let args = ProbeArgs {
            url: Some("opc.ws://from-cli:2".into()),
            nodes: vec!["ns=2;s=Level".into()],
            timestamps: Some(TimestampsArg::Neither),
            certificate: None,
        };
        apply_args(&mut config, args).unwrap();

        assert_eq!(config.probe.url.as_deref(), Some("opc.ws://from-cli:2"));
        assert_eq!(config.probe.nodes, vec!["ns=2;s=Level"]);
        assert_eq!(config.probe.timestamps, TimestampsToReturn::Neither);
    }

    #[test]
    fn test_empty_args_keep_config() {
        let mut config = ProbeConfig::default();
        apply_args(&mut config, ProbeArgs::default()).unwrap();
        assert_eq!(config.probe.nodes.len(), 2);
        assert!(config.probe.url.is_none());
    }

    #[test]
    fn test_bad_node_rejected() {
        let mut config = ProbeConfig::default();
        let args = ProbeArgs {
            nodes: vec!["Node1".into()],
            ..ProbeArgs::default()
        };
        let err = apply_args(&mut config, args).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
