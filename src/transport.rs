//! Transport options shared by the VLESS, VMess and Trojan URI parsers
//!
//! The `type` (or `net`) query parameter picks the transport; the matching
//! `*-opts` mapping is filled from `path`, `host`, `serviceName`, `mode`,
//! `seed` and `headerType`.

use crate::descriptor::{GrpcOpts, H2Opts, HostList, HttpOpts, KcpOpts, ProxyDescriptor, TcpOpts, WsOpts};
use crate::link::{QueryParams, decode_component};

/// Query keys accepted for the gRPC service name, in priority order.
const GRPC_SERVICE_KEYS: [&str; 5] = [
    "serviceName",
    "servicename",
    "service-name",
    "service_name",
    "service",
];

/// Transports a parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transports {
    /// VLESS: every transport including kcp, tcp headers and xhttp
    Full,
    /// VMess URI form: ws, grpc, h2, http
    Common,
    /// Trojan: ws and grpc only
    WsGrpc,
}

/// Lower-cased transport name from `type`/`net`, `tcp` when absent.
pub(crate) fn network_of(q: &QueryParams) -> String {
    q.first_non_empty(&["type", "net"])
        .unwrap_or("tcp")
        .to_ascii_lowercase()
}

/// Fills `network` overrides and transport options on `p` from the query.
pub(crate) fn apply(p: &mut ProxyDescriptor, q: &QueryParams, transports: Transports) {
    let net = network_of(q);
    let path = q.non_empty("path").map(decode_component);
    let host = q.non_empty("host").map(str::to_string);

    match (net.as_str(), transports) {
        ("ws", _) => {
            if transports == Transports::WsGrpc {
                p.network = Some("ws".to_string());
            }
            p.ws_opts = Some(WsOpts {
                path: path.unwrap_or_default(),
                host,
            });
        }
        ("grpc", _) => {
            p.network = Some("grpc".to_string());
            let grpc = GrpcOpts {
                grpc_service_name: q.first_non_empty(&GRPC_SERVICE_KEYS).map(decode_component),
                mode: q.non_empty("mode").map(str::to_string),
            };
            if !grpc.is_empty() {
                p.grpc_opts = Some(grpc);
            }
        }
        ("h2", Transports::Full | Transports::Common) => {
            p.network = Some("h2".to_string());
            let h2 = H2Opts {
                path,
                host: q
                    .non_empty("host")
                    .and_then(|h| HostList::from_csv(&decode_component(h))),
            };
            if !h2.is_empty() {
                p.h2_opts = Some(h2);
            }
        }
        ("http", Transports::Full | Transports::Common)
        | ("httpupgrade" | "xhttp", Transports::Full) => {
            let network = if net == "xhttp" { "xhttp" } else { "http" };
            p.network = Some(network.to_string());
            p.http_opts = Some(HttpOpts {
                path: path.unwrap_or_default(),
                host,
            });
        }
        ("kcp", Transports::Full) => {
            p.network = Some("kcp".to_string());
            let kcp = KcpOpts {
                seed: q.non_empty("seed").map(decode_component),
                header_type: q.non_empty("headerType").map(str::to_string),
            };
            if !kcp.is_empty() {
                p.kcp_opts = Some(kcp);
            }
        }
        ("tcp", Transports::Full) => {
            if let Some(header_type) = q.non_empty("headerType") {
                p.tcp_opts = Some(TcpOpts {
                    header_type: header_type.to_string(),
                });
            }
        }
        _ => {}
    }
}

/// Comma separated ALPN list from the query, `None` when empty.
pub(crate) fn alpn_of(q: &QueryParams) -> Option<Vec<String>> {
    q.non_empty("alpn")
        .map(crate::descriptor::split_list)
        .filter(|list| !list.is_empty())
}
