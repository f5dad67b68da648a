use crate::metrics::MetricsSnapshot;
use crate::protocol::StatusReport;

/// Render a metrics snapshot into Prometheus text exposition format.
pub(crate) fn render_prometheus_metrics(snapshot: &MetricsSnapshot, status: &StatusReport) -> String {
    use std::fmt::Write;

    fn write_metric(buf: &mut String, name: &str, help: &str, metric_type: &str, value: u64) {
        let _ = writeln!(buf, "# HELP {name} {help}");
        let _ = writeln!(buf, "# TYPE {name} {metric_type}");
        let _ = writeln!(buf, "{name} {value}");
    }

    fn counter(buf: &mut String, name: &str, help: &str, value: u64) {
        write_metric(buf, name, help, "counter", value);
    }

    fn gauge(buf: &mut String, name: &str, help: &str, value: u64) {
        write_metric(buf, name, help, "gauge", value);
    }

    let mut buf = String::new();

    counter(
        &mut buf,
        "signal_relay_connections_total",
        "Total connections accepted since startup",
        snapshot.connections.total_connections,
    );
    gauge(
        &mut buf,
        "signal_relay_connections_active",
        "Number of currently registered connections",
        status.connections as u64,
    );
    counter(
        &mut buf,
        "signal_relay_connections_disconnections_total",
        "Total connection closures observed since startup",
        snapshot.connections.disconnections,
    );
    counter(
        &mut buf,
        "signal_relay_connections_rejected_total",
        "Connections refused by the per-IP admission limit",
        snapshot.connections.rejected_connections,
    );
    counter(
        &mut buf,
        "signal_relay_websocket_errors_total",
        "WebSocket read errors observed",
        snapshot.connections.websocket_errors,
    );
    counter(
        &mut buf,
        "signal_relay_outbound_messages_dropped_total",
        "Server messages dropped because a recipient's outbound queue was full",
        snapshot.connections.outbound_messages_dropped,
    );

    gauge(
        &mut buf,
        "signal_relay_channels_active",
        "Number of channels with at least one member",
        status.channels as u64,
    );
    counter(
        &mut buf,
        "signal_relay_channels_created_total",
        "Total channels created since startup",
        snapshot.channels.channels_created,
    );
    counter(
        &mut buf,
        "signal_relay_channels_deleted_total",
        "Total channels removed after their last member left",
        snapshot.channels.channels_deleted,
    );
    counter(
        &mut buf,
        "signal_relay_joins_total",
        "Total channel joins processed",
        snapshot.channels.joins,
    );
    counter(
        &mut buf,
        "signal_relay_leaves_total",
        "Total channel departures processed",
        snapshot.channels.leaves,
    );

    counter(
        &mut buf,
        "signal_relay_signals_delivered_total",
        "Targeted signals enqueued for their recipient",
        snapshot.routing.signals_delivered,
    );
    counter(
        &mut buf,
        "signal_relay_signals_dropped_total",
        "Targeted signals dropped because the target was not reachable",
        snapshot.routing.signals_dropped,
    );
    counter(
        &mut buf,
        "signal_relay_relayed_messages_total",
        "Legacy payloads broadcast to a channel",
        snapshot.routing.relayed_messages,
    );
    counter(
        &mut buf,
        "signal_relay_relay_deliveries_total",
        "Individual deliveries produced by legacy broadcasts",
        snapshot.routing.relay_deliveries,
    );

    counter(
        &mut buf,
        "signal_relay_credential_requests_total",
        "TURN credential requests handled",
        snapshot.credentials.requests,
    );
    counter(
        &mut buf,
        "signal_relay_credential_failures_total",
        "TURN credential requests the issuer failed",
        snapshot.credentials.failures,
    );

    counter(
        &mut buf,
        "signal_relay_invalid_messages_total",
        "Inbound messages rejected as malformed",
        snapshot.errors.invalid_messages,
    );
    counter(
        &mut buf,
        "signal_relay_oversized_messages_total",
        "Inbound frames rejected for exceeding the size limit",
        snapshot.errors.oversized_messages,
    );
    counter(
        &mut buf,
        "signal_relay_state_errors_total",
        "Inbound messages not valid for the connection's state",
        snapshot.errors.state_errors,
    );

    buf
}
