//! Service lookup by type and discriminator

use crate::model::{Service, ServiceType};

/// Index of the first service of `kind` whose discriminator equals `discriminator`
///
/// Comparison is exact: no trimming, case folding or URL normalisation.
pub fn locate_service(
    services: &[Service],
    kind: ServiceType,
    discriminator: &str,
) -> Option<usize> {
    services.iter().position(|service| {
        service.service_type() == Some(kind) && service.discriminator() == Some(discriminator)
    })
}
