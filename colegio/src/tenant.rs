use crate::models::Id;

/// Colegio sobre el que opera una petición. Todas las consultas del `Store`
/// lo reciben explícitamente.
///
/// Solo se construye dentro del crate, resolviendo un dominio con
/// `Store::resolve_tenant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    school_id: Id,
}

impl TenantContext {
    pub(crate) fn new(school_id: Id) -> Self {
        TenantContext { school_id }
    }

    pub fn school_id(&self) -> Id {
        self.school_id
    }
}

/// Quita el puerto de un valor de cabecera `Host` y lo pasa a minúsculas.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    // [::1]:8080
    let without_port = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        host.split(':').next().unwrap_or(host)
    };
    without_port.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_port_and_case() {
        assert_eq!(normalize_host("Colegio.Example.com:8080"), "colegio.example.com");
        assert_eq!(normalize_host("localhost"), "localhost");
        assert_eq!(normalize_host("[::1]:8080"), "[::1]");
    }
}
