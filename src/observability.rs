use crate::protocol::ApiKey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Process-wide request counters. Relaxed atomics only; no locks.
pub struct Observability {
    requests_sent_total: AtomicU64,
    responses_decoded_total: AtomicU64,
    responses_synthesized_total: AtomicU64,
    inbound_requests_total: AtomicU64,
    inbound_errors_total: AtomicU64,
    init_producer_id_total: AtomicU64,
    api_versions_total: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub requests_sent_total: u64,
    pub responses_decoded_total: u64,
    pub responses_synthesized_total: u64,
    pub inbound_requests_total: u64,
    pub inbound_errors_total: u64,
}

impl Observability {
    fn new() -> Self {
        Self {
            requests_sent_total: AtomicU64::new(0),
            responses_decoded_total: AtomicU64::new(0),
            responses_synthesized_total: AtomicU64::new(0),
            inbound_requests_total: AtomicU64::new(0),
            inbound_errors_total: AtomicU64::new(0),
            init_producer_id_total: AtomicU64::new(0),
            api_versions_total: AtomicU64::new(0),
        }
    }

    fn api_counter(&self, api: ApiKey) -> &AtomicU64 {
        match api {
            ApiKey::InitProducerId => &self.init_producer_id_total,
            ApiKey::ApiVersions => &self.api_versions_total,
        }
    }

    pub fn record_sent(&self, api: ApiKey) {
        self.requests_sent_total.fetch_add(1, Ordering::Relaxed);
        self.api_counter(api).fetch_add(1, Ordering::Relaxed);
    }

    /// Outcome of one client round trip: a decoded reply or a synthesized one.
    pub fn record_outcome(&self, synthesized: bool) {
        if synthesized {
            self.responses_synthesized_total
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.responses_decoded_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_inbound(&self, ok: bool) {
        self.inbound_requests_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.inbound_errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            requests_sent_total: self.requests_sent_total.load(Ordering::Relaxed),
            responses_decoded_total: self.responses_decoded_total.load(Ordering::Relaxed),
            responses_synthesized_total: self.responses_synthesized_total.load(Ordering::Relaxed),
            inbound_requests_total: self.inbound_requests_total.load(Ordering::Relaxed),
            inbound_errors_total: self.inbound_errors_total.load(Ordering::Relaxed),
        }
    }

    pub fn render_prometheus(&self) -> String {
        let snap = self.snapshot();
        let mut out = String::new();
        for (name, value) in [
            ("txnwire_requests_sent_total", snap.requests_sent_total),
            ("txnwire_responses_decoded_total", snap.responses_decoded_total),
            (
                "txnwire_responses_synthesized_total",
                snap.responses_synthesized_total,
            ),
            ("txnwire_inbound_requests_total", snap.inbound_requests_total),
            ("txnwire_inbound_errors_total", snap.inbound_errors_total),
        ] {
            out.push_str(&format!("# TYPE {} counter\n", name));
            out.push_str(&format!("{} {}\n", name, value));
        }
        out.push_str("# TYPE txnwire_requests_by_api_total counter\n");
        for api in ApiKey::ALL {
            out.push_str(&format!(
                "txnwire_requests_by_api_total{{api=\"{}\"}} {}\n",
                api.name(),
                self.api_counter(api).load(Ordering::Relaxed)
            ));
        }
        out
    }
}

static OBS: OnceLock<Observability> = OnceLock::new();

pub fn observability() -> &'static Observability {
    OBS.get_or_init(Observability::new)
}
