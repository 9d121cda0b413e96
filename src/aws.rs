//! AWS EC2 inventory provider
//!
//! Lists instances and reserved instances for one region and flattens the
//! SDK types into `InstanceRecord` / `ReservationRecord`. Instance listing
//! goes through the SDK paginator; reserved instances come back in a single
//! response.
//!
//! Missing fields are defaulted here rather than reported:
//! - no instance type or zone → `"unknown"`
//! - no platform → `None` (counted as linux downstream)
//! - no or negative reservation count → 0

use crate::error::{CheckError, Result};
use crate::provider::{
    normalize_instance_state, normalize_reservation_state, InstanceRecord, InventoryProvider,
    ReservationRecord,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{Instance as Ec2Instance, InstanceLifecycleType, ReservedInstances};
use aws_sdk_ec2::Client as Ec2Client;
use tracing::{debug, info};

const UNKNOWN: &str = "unknown";

/// EC2-backed inventory for a single region
pub struct Ec2Inventory {
    client: Ec2Client,
}

impl Ec2Inventory {
    pub fn new(client: Ec2Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain, pinned to `region`
    pub async fn connect(region: &str) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Ec2Client::new(&aws_config))
    }
}

#[async_trait]
impl InventoryProvider for Ec2Inventory {
    fn name(&self) -> &'static str {
        "aws"
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRecord>> {
        let mut records = Vec::new();
        let mut pages = self.client.describe_instances().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| provider_error("DescribeInstances", e))?;
            for reservation in page.reservations() {
                records.extend(reservation.instances().iter().map(instance_record));
            }
        }

        info!("Listed {} instances", records.len());
        Ok(records)
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationRecord>> {
        let response = self
            .client
            .describe_reserved_instances()
            .send()
            .await
            .map_err(|e| provider_error("DescribeReservedInstances", e))?;

        let records: Vec<ReservationRecord> = response
            .reserved_instances()
            .iter()
            .map(reservation_record)
            .collect();

        info!("Listed {} reserved instance offerings", records.len());
        Ok(records)
    }
}

/// Flatten an SDK instance into an `InstanceRecord`
pub fn instance_record(instance: &Ec2Instance) -> InstanceRecord {
    let id = instance.instance_id().unwrap_or(UNKNOWN).to_string();

    let state = normalize_instance_state(
        instance
            .state()
            .and_then(|s| s.name())
            .map(|s| s.as_str())
            .unwrap_or(UNKNOWN),
    );

    let spot = instance.instance_lifecycle() == Some(&InstanceLifecycleType::Spot)
        || instance.spot_instance_request_id().is_some();

    let platform = instance
        .platform()
        .map(|p| p.as_str().to_string())
        .or_else(|| instance.platform_details().map(str::to_string));

    let tags = instance
        .tags()
        .iter()
        .filter_map(|tag| {
            tag.key()
                .zip(tag.value())
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect();

    InstanceRecord {
        id,
        state,
        spot,
        instance_type: instance
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        availability_zone: instance
            .placement()
            .and_then(|p| p.availability_zone())
            .unwrap_or(UNKNOWN)
            .to_string(),
        platform,
        tags,
    }
}

/// Flatten an SDK reserved-instances offering into a `ReservationRecord`
pub fn reservation_record(reserved: &ReservedInstances) -> ReservationRecord {
    let id = reserved.reserved_instances_id().unwrap_or(UNKNOWN).to_string();

    let instance_count = match reserved.instance_count() {
        Some(n) => u32::try_from(n).unwrap_or_else(|_| {
            debug!("Reservation {} reports count {}, using 0", id, n);
            0
        }),
        None => 0,
    };

    ReservationRecord {
        state: normalize_reservation_state(
            reserved.state().map(|s| s.as_str()).unwrap_or(UNKNOWN),
        ),
        instance_type: reserved
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        availability_zone: reserved
            .availability_zone()
            .filter(|z| !z.is_empty())
            .map(str::to_string),
        scope: reserved.scope().map(|s| s.as_str().to_lowercase()),
        product_description: reserved.product_description().map(|d| d.as_str().to_string()),
        instance_count,
        id,
    }
}

/// Map an SDK failure onto the typed provider error
fn provider_error<E, R>(operation: &str, err: SdkError<E, R>) -> CheckError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(ref service) => {
            let inner = service.err();
            CheckError::from_provider_code(
                operation,
                inner.code(),
                inner.message().unwrap_or("no message from service"),
            )
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            CheckError::Transport {
                operation: operation.to_string(),
                message: DisplayErrorContext(&err).to_string(),
                source: Some(Box::new(err)),
            }
        }
        other => CheckError::Api {
            operation: operation.to_string(),
            code: UNKNOWN.to_string(),
            message: DisplayErrorContext(&other).to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InstanceState, ReservationState};
    use aws_sdk_ec2::types::{
        InstanceState as Ec2InstanceState, InstanceStateName, InstanceType, Placement,
        PlatformValues, ReservedInstanceState, RiProductDescription, Scope, Tag,
    };

    fn running_instance() -> aws_sdk_ec2::types::builders::InstanceBuilder {
        Ec2Instance::builder()
            .instance_id("i-0abc")
            .instance_type(InstanceType::M5Large)
            .state(Ec2InstanceState::builder().name(InstanceStateName::Running).build())
            .placement(Placement::builder().availability_zone("us-east-1a").build())
    }

    #[test]
    fn test_instance_record_basic_fields() {
        let record = instance_record(
            &running_instance()
                .tags(Tag::builder().key("Name").value("web-1").build())
                .build(),
        );

        assert_eq!(record.id, "i-0abc");
        assert_eq!(record.state, InstanceState::Running);
        assert!(!record.spot);
        assert_eq!(record.instance_type, "m5.large");
        assert_eq!(record.availability_zone, "us-east-1a");
        assert_eq!(record.platform, None);
        assert_eq!(record.display_name(), "web-1");
    }

    #[test]
    fn test_instance_record_spot_detection() {
        let by_lifecycle = instance_record(
            &running_instance()
                .instance_lifecycle(InstanceLifecycleType::Spot)
                .build(),
        );
        assert!(by_lifecycle.spot);

        let by_request = instance_record(
            &running_instance()
                .spot_instance_request_id("sir-123")
                .build(),
        );
        assert!(by_request.spot);
    }

    #[test]
    fn test_instance_record_windows_platform() {
        let record = instance_record(&running_instance().platform(PlatformValues::Windows).build());
        assert_eq!(record.platform.as_deref(), Some("Windows"));
    }

    #[test]
    fn test_instance_record_missing_fields() {
        let record = instance_record(&Ec2Instance::builder().build());
        assert_eq!(record.id, "unknown");
        assert_eq!(record.instance_type, "unknown");
        assert_eq!(record.availability_zone, "unknown");
        assert!(matches!(record.state, InstanceState::Other(_)));
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_reservation_record_regional() {
        let record = reservation_record(
            &ReservedInstances::builder()
                .reserved_instances_id("ri-1")
                .state(ReservedInstanceState::Active)
                .instance_type(InstanceType::C5Xlarge)
                .scope(Scope::Region)
                .product_description(RiProductDescription::LinuxUnix)
                .instance_count(2)
                .build(),
        );

        assert_eq!(record.state, ReservationState::Active);
        assert_eq!(record.instance_type, "c5.xlarge");
        assert_eq!(record.availability_zone, None);
        assert_eq!(record.scope.as_deref(), Some("region"));
        assert_eq!(record.product_description.as_deref(), Some("Linux/UNIX"));
        assert_eq!(record.instance_count, 2);
    }

    #[test]
    fn test_reservation_record_negative_count() {
        let record = reservation_record(
            &ReservedInstances::builder()
                .state(ReservedInstanceState::Retired)
                .availability_zone("us-east-1a")
                .instance_count(-1)
                .build(),
        );
        assert_eq!(record.instance_count, 0);
        assert_eq!(record.availability_zone.as_deref(), Some("us-east-1a"));
        assert_eq!(
            record.state,
            ReservationState::Other("retired".to_string())
        );
    }
}
