//! サービス車両（整備・輸送代行）モジュール

use crate::{
    tracked_entity::{EntityLoadPlan, RelationsPlan, TrackedEntityType},
    workflow::{
        ProcessDefinition, StatusDefinition, StepCapability, StepDefinition,
        SubprocessDefinition, TenantModule,
    },
};

pub(super) const NAMESPACE: &str = "service";

pub(super) fn module() -> TenantModule {
    TenantModule::new(NAMESPACE, "Service", vec![maintenance(), transport()])
        .with_relations(relations())
}

fn relations() -> RelationsPlan {
    RelationsPlan::new().with(
        TrackedEntityType::ServiceVehicle,
        EntityLoadPlan {
            columns:   None,
            relations: Some(vec!["owner".to_string()]),
        },
    )
}

fn vehicle_received() -> StepDefinition {
    StepDefinition::new("vehicleReceived", "Vehicle received").capability(StepCapability::Date)
}

fn owner_informed() -> StepDefinition {
    StepDefinition::new("ownerInformed", "Owner informed")
        .modal("message")
        .capability(StepCapability::Email {
            template: "Message to the owner".to_string(),
        })
}

fn maintenance() -> ProcessDefinition {
    ProcessDefinition::new("maintenance", "Maintenance")
        .subprocess(
            SubprocessDefinition::new("intake", "Intake")
                .status(StatusDefinition::all("received", "Received").step(vehicle_received()))
                .status(
                    StatusDefinition::all("inspected", "Inspected").step(
                        StepDefinition::new("inspectionDone", "Inspection done")
                            .modal("documents-upload")
                            .capability(StepCapability::Date),
                    ),
                ),
        )
        .subprocess(
            SubprocessDefinition::new("workshop", "Workshop")
                .status(
                    StatusDefinition::all("repairPlanned", "Repair Planned").step(
                        StepDefinition::new("repairScheduled", "Repair scheduled")
                            .modal("week-picker")
                            .capability(StepCapability::WeekRange)
                            .capability(StepCapability::Email {
                                template: "The repair of your vehicle is planned between"
                                    .to_string(),
                            }),
                    ),
                )
                .status(
                    StatusDefinition::any("partsAvailable", "Parts Available")
                        .step(
                            StepDefinition::new("partsInStock", "Parts in stock")
                                .capability(StepCapability::Date),
                        )
                        .step(
                            StepDefinition::new("partsOrdered", "Parts ordered")
                                .capability(StepCapability::Date),
                        ),
                )
                .status(
                    StatusDefinition::all("repairDone", "Repair Done").step(
                        StepDefinition::new("repairDone", "Repair done")
                            .capability(StepCapability::Date)
                            .capability(StepCapability::Email {
                                template: "The repair of your vehicle was completed on"
                                    .to_string(),
                            }),
                    ),
                ),
        )
        .subprocess(
            SubprocessDefinition::new("delivery", "Delivery").status(
                StatusDefinition::all("returned", "Returned")
                    .step(owner_informed())
                    .step(
                        StepDefinition::new("vehicleReturned", "Vehicle returned")
                            .capability(StepCapability::Date),
                    ),
            ),
        )
}

fn transport() -> ProcessDefinition {
    ProcessDefinition::new("transport", "Transport Service")
        .subprocess(
            SubprocessDefinition::new("pickup", "Pickup")
                .status(
                    StatusDefinition::all("pickupPlanned", "Pickup Planned").step(
                        StepDefinition::new("pickupScheduled", "Pickup scheduled")
                            .capability(StepCapability::Date),
                    ),
                )
                .status(StatusDefinition::all("received", "Received").step(vehicle_received())),
        )
        .subprocess(
            SubprocessDefinition::new("dropOff", "Drop-off").status(
                StatusDefinition::all("delivered", "Delivered")
                    .step(
                        StepDefinition::new("deliveredAtDestination", "Delivered at destination")
                            .capability(StepCapability::Date),
                    )
                    .step(owner_informed()),
            ),
        )
}
