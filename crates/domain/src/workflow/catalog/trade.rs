//! 売買（輸入・輸出）モジュール

use crate::{
    tracked_entity::{EntityLoadPlan, RelationsPlan, TrackedEntityType},
    workflow::{
        ProcessDefinition, StatusDefinition, StepCapability, StepDefinition,
        SubprocessDefinition, TenantModule,
    },
};

pub(super) const NAMESPACE: &str = "trade";

pub(super) fn module() -> TenantModule {
    TenantModule::new(NAMESPACE, "Trade", vec![import(), export()]).with_relations(relations())
}

fn relations() -> RelationsPlan {
    RelationsPlan::new().with(
        TrackedEntityType::Vehicle,
        EntityLoadPlan {
            columns:   Some(
                [
                    "id",
                    "tenant_id",
                    "vin",
                    "license_plate",
                    "make",
                    "model",
                    "first_registration",
                    "deleted_at",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
            ),
            relations: Some(vec!["purchase".to_string(), "sale".to_string()]),
        },
    )
}

// --- 複数プロセスで共有するステップ ---

fn contract_signed() -> StepDefinition {
    StepDefinition::new("contractSigned", "Contract signed").capability(StepCapability::Date)
}

fn has_received_original_documents() -> StepDefinition {
    StepDefinition::new("hasReceivedOriginalDocuments", "Original documents received")
        .modal("documents-upload")
}

fn transport_booked() -> StepDefinition {
    StepDefinition::new("transportBooked", "Transport booked")
        .modal("week-picker")
        .capability(StepCapability::WeekRange)
        .capability(StepCapability::Email {
            template: "The transport of the vehicle is planned between".to_string(),
        })
}

fn documents_received() -> StatusDefinition {
    StatusDefinition::all("documentsReceived", "Documents Received")
        .step(has_received_original_documents())
}

fn import() -> ProcessDefinition {
    ProcessDefinition::new("import", "Import")
        .subprocess(
            SubprocessDefinition::new("purchase", "Purchase")
                .status(
                    StatusDefinition::all("purchaseAgreed", "Purchase Agreed")
                        .step(contract_signed())
                        .step(
                            StepDefinition::new("depositPaid", "Deposit paid")
                                .capability(StepCapability::Date),
                        ),
                )
                .status(
                    StatusDefinition::any("paymentCompleted", "Payment Completed")
                        .step(
                            StepDefinition::new("paidByBankTransfer", "Paid by bank transfer")
                                .capability(StepCapability::Date),
                        )
                        .step(
                            StepDefinition::new("paidInCash", "Paid in cash")
                                .capability(StepCapability::Date),
                        ),
                ),
        )
        .subprocess(
            SubprocessDefinition::new("transportInbound", "Transport Inbound")
                .status(
                    StatusDefinition::all("transportPlanned", "Transport Planned")
                        .step(transport_booked()),
                )
                .status(
                    StatusDefinition::all("vehicleArrived", "Vehicle Arrived").step(
                        StepDefinition::new("vehicleArrived", "Vehicle arrived")
                            .capability(StepCapability::Date),
                    ),
                ),
        )
        .subprocess(
            SubprocessDefinition::new("registration", "Registration")
                .status(documents_received())
                .status(
                    StatusDefinition::all("rdwApproved", "RDW Approved")
                        .step(
                            StepDefinition::new("rdwInspectionPlanned", "RDW inspection planned")
                                .capability(StepCapability::Date),
                        )
                        .step(
                            StepDefinition::new("rdwApproved", "RDW approved")
                                .capability(StepCapability::Date)
                                .capability(StepCapability::Email {
                                    template: "The vehicle has been approved by the RDW on"
                                        .to_string(),
                                }),
                        ),
                ),
        )
        .subprocess(
            SubprocessDefinition::new("invoicing", "Invoicing").status(
                StatusDefinition::all("invoiceSent", "Invoice Sent")
                    .step(
                        StepDefinition::new("invoiceSent", "Invoice sent")
                            .capability(StepCapability::Date),
                    )
                    .step(
                        StepDefinition::new("customerInformed", "Customer informed")
                            .modal("message")
                            .capability(StepCapability::Email {
                                template: "Message to the customer".to_string(),
                            }),
                    ),
            ),
        )
}

fn export() -> ProcessDefinition {
    ProcessDefinition::new("export", "Export")
        .subprocess(
            SubprocessDefinition::new("sales", "Sales").status(
                StatusDefinition::all("saleAgreed", "Sale Agreed")
                    .step(contract_signed())
                    .step(
                        StepDefinition::new("paymentReceived", "Payment received")
                            .capability(StepCapability::Date),
                    ),
            ),
        )
        .subprocess(
            SubprocessDefinition::new("exportDocuments", "Export Documents")
                .status(documents_received())
                .status(
                    StatusDefinition::all("exportRegistered", "Export Registered")
                        .step(
                            StepDefinition::new("deregisteredAtRdw", "Deregistered at RDW")
                                .capability(StepCapability::Date),
                        )
                        .step(
                            StepDefinition::new(
                                "exportCertificateReceived",
                                "Export certificate received",
                            )
                            .capability(StepCapability::Date),
                        ),
                ),
        )
        .subprocess(
            SubprocessDefinition::new("transportOutbound", "Transport Outbound")
                .status(
                    StatusDefinition::all("transportPlanned", "Transport Planned")
                        .step(transport_booked()),
                )
                .status(
                    StatusDefinition::all("vehicleDelivered", "Vehicle Delivered").step(
                        StepDefinition::new("vehicleDelivered", "Vehicle delivered")
                            .capability(StepCapability::Date),
                    ),
                ),
        )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_輸入と輸出は原本書類ステップを共有する() {
        let module = module();

        let in_import = module.process("import").unwrap().find_step("hasReceivedOriginalDocuments");
        let in_export = module.process("export").unwrap().find_step("hasReceivedOriginalDocuments");
        assert_eq!(in_import, in_export);
    }

    #[test]
    fn test_輸送予約ステップは週範囲とメールを持つ() {
        let module = module();
        let step = module.step("transportBooked").unwrap();

        assert!(step.requires_week_range());
        assert!(step.sends_email());
    }
}
