//! Port-spec grammar parser, Docker-compose compatible. Hand-rolled field
//! splitting — the grammar is five small cases on a colon-delimited
//! string, not worth a parser-combinator dependency.

use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{PolyrunError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub bind_ip: Option<IpAddr>,
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: Protocol,
}

/// Parses one entry of a `Service::ports` list. `containerized` decides
/// whether a bare `"P"` means "auto-assign host port, expose container
/// port P" (true) or "bind host and container to the same literal port"
/// (false) — `hostPort=0` is only valid when `containerized` is true.
pub fn parse(raw: &str, containerized: bool) -> Result<PortMapping> {
    let invalid = || PolyrunError::PortOutOfRange(0);
    let (body, protocol) = split_protocol(raw);

    if let Some(rest) = body.strip_prefix('[') {
        let close = rest.find(']').ok_or_else(invalid)?;
        let ip = IpAddr::from_str(&rest[..close]).map_err(|_| invalid())?;
        let after = rest[close + 1..].strip_prefix(':').ok_or_else(invalid)?;
        let (host_port, container_port) = split_host_container(after)?;
        return Ok(PortMapping {
            bind_ip: Some(ip),
            host_port,
            container_port,
            protocol,
        });
    }

    let parts: Vec<&str> = body.split(':').collect();
    match parts.len() {
        1 => {
            let p: u16 = parts[0].parse().map_err(|_| invalid())?;
            if containerized {
                Ok(PortMapping {
                    bind_ip: None,
                    host_port: 0,
                    container_port: p,
                    protocol,
                })
            } else {
                Ok(PortMapping {
                    bind_ip: None,
                    host_port: p,
                    container_port: p,
                    protocol,
                })
            }
        }
        2 => {
            let host_port: u16 = parts[0].parse().map_err(|_| invalid())?;
            let container_port: u16 = parts[1].parse().map_err(|_| invalid())?;
            Ok(PortMapping {
                bind_ip: None,
                host_port,
                container_port,
                protocol,
            })
        }
        n if n >= 3 => {
            if n == 3 && parts[0].contains('.') {
                let ip = IpAddr::from_str(parts[0]).map_err(|_| invalid())?;
                let host_port: u16 = parts[1].parse().map_err(|_| invalid())?;
                let container_port: u16 = parts[2].parse().map_err(|_| invalid())?;
                Ok(PortMapping {
                    bind_ip: Some(ip),
                    host_port,
                    container_port,
                    protocol,
                })
            } else {
                // Unbracketed IPv6: "v6:H:C" — last two fields are H:C,
                // everything before is the rejoined v6 literal.
                let container_port: u16 = parts[n - 1].parse().map_err(|_| invalid())?;
                let host_port: u16 = parts[n - 2].parse().map_err(|_| invalid())?;
                let ip_str = parts[..n - 2].join(":");
                let ip = IpAddr::from_str(&ip_str).map_err(|_| invalid())?;
                Ok(PortMapping {
                    bind_ip: Some(ip),
                    host_port,
                    container_port,
                    protocol,
                })
            }
        }
        _ => Err(invalid()),
    }
}

fn split_host_container(s: &str) -> Result<(u16, u16)> {
    let (h, c) = s
        .split_once(':')
        .ok_or_else(|| PolyrunError::PortOutOfRange(0))?;
    let host_port: u16 = h.parse().map_err(|_| PolyrunError::PortOutOfRange(0))?;
    let container_port: u16 = c.parse().map_err(|_| PolyrunError::PortOutOfRange(0))?;
    Ok((host_port, container_port))
}

fn split_protocol(raw: &str) -> (&str, Protocol) {
    if let Some(body) = raw.strip_suffix("/udp") {
        (body, Protocol::Udp)
    } else if let Some(body) = raw.strip_suffix("/tcp") {
        (body, Protocol::Tcp)
    } else {
        (raw, Protocol::Tcp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_port_not_containerized() {
        let m = parse("3000", false).unwrap();
        assert_eq!(m.host_port, 3000);
        assert_eq!(m.container_port, 3000);
    }

    #[test]
    fn bare_port_containerized_auto_assigns() {
        let m = parse("8080", true).unwrap();
        assert_eq!(m.host_port, 0);
        assert_eq!(m.container_port, 8080);
    }

    #[test]
    fn host_colon_container() {
        let m = parse("8080:80", false).unwrap();
        assert_eq!(m.host_port, 8080);
        assert_eq!(m.container_port, 80);
    }

    #[test]
    fn ipv4_host_container() {
        let m = parse("127.0.0.1:8080:80", false).unwrap();
        assert_eq!(m.bind_ip, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(m.host_port, 8080);
        assert_eq!(m.container_port, 80);
    }

    #[test]
    fn bracketed_ipv6() {
        let m = parse("[::1]:8080:80", false).unwrap();
        assert_eq!(m.bind_ip, Some("::1".parse().unwrap()));
        assert_eq!(m.host_port, 8080);
        assert_eq!(m.container_port, 80);
    }

    #[test]
    fn unbracketed_ipv6() {
        let m = parse("::1:8080:80", false).unwrap();
        assert_eq!(m.bind_ip, Some("::1".parse().unwrap()));
        assert_eq!(m.host_port, 8080);
        assert_eq!(m.container_port, 80);
    }

    #[test]
    fn udp_suffix() {
        let m = parse("8080:80/udp", false).unwrap();
        assert_eq!(m.protocol, Protocol::Udp);
    }

    #[test]
    fn round_trips_semantically() {
        for spec in ["3000", "8080:80", "127.0.0.1:8080:80", "[::1]:8080:80", "8080:80/udp"] {
            assert!(parse(spec, false).is_ok(), "failed to parse {spec}");
        }
    }
}
