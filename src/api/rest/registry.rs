use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{
    enums::{CorrespondenceType, CurrencyCode, ProjectStatus, RecurringFrequency, SupplierContractStatus, SupplierContractType},
    models::FullAddress,
    registry::{
        ComplianceItemInputType, ComplianceItemListInputType, ContractInputType, ContractListInputType, CorrespondenceInputType, CorrespondenceListInputType, InsuranceInputType, InsuranceListInputType, ProjectInputType,
        ProjectListInputType, SupplierInputType, SupplierListInputType,
    },
};

/***************** Suppliers *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRequest {
    pub name: String,
    pub vat_number: Option<String>,
    pub company_phone: Option<String>,
    pub company_email: Option<String>,
    pub pec: Option<String>,
    pub iban: Option<String>,
    pub sdi_code: Option<String>,
    #[serde(default)]
    pub address: FullAddress,
}

impl From<SupplierRequest> for SupplierInputType {
    fn from(request: SupplierRequest) -> Self {
        SupplierInputType {
            name: request.name,
            vat_number: request.vat_number,
            company_phone: request.company_phone,
            company_email: request.company_email,
            pec: request.pec,
            iban: request.iban,
            sdi_code: request.sdi_code,
            address: request.address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierListRequest {
    pub keyword: Option<String>,
}

impl From<SupplierListRequest> for SupplierListInputType {
    fn from(request: SupplierListRequest) -> Self {
        SupplierListInputType { keyword: request.keyword }
    }
}

/***************** Contracts *********************/

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRequest {
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
    pub contract_type: Option<SupplierContractType>,
    pub subject: Option<String>,
    pub status: Option<SupplierContractStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub termination_notice_days: Option<i32>,
    pub expiry_reminder: Option<NaiveDate>,
    pub amount_net: Option<Decimal>,
    pub vat_rate: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub payment_terms: Option<String>,
    pub periodic_fee: Option<Decimal>,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub needs_durc: Option<bool>,
    pub durc_expiry: Option<NaiveDate>,
    pub reference_person: Option<String>,
}

impl From<ContractRequest> for ContractInputType {
    fn from(request: ContractRequest) -> Self {
        ContractInputType {
            supplier_id: request.supplier_id,
            project_id: request.project_id,
            contract_type: request.contract_type,
            subject: request.subject,
            status: request.status,
            start_date: request.start_date,
            end_date: request.end_date,
            termination_notice_days: request.termination_notice_days,
            expiry_reminder: request.expiry_reminder,
            amount_net: request.amount_net,
            vat_rate: request.vat_rate,
            currency: request.currency,
            payment_terms: request.payment_terms,
            periodic_fee: request.periodic_fee,
            recurring_frequency: request.recurring_frequency,
            needs_durc: request.needs_durc,
            durc_expiry: request.durc_expiry,
            reference_person: request.reference_person,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractListRequest {
    pub status: Option<SupplierContractStatus>,
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
}

impl From<ContractListRequest> for ContractListInputType {
    fn from(request: ContractListRequest) -> Self {
        ContractListInputType { status: request.status, supplier_id: request.supplier_id, project_id: request.project_id }
    }
}

/***************** Insurances *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceRequest {
    pub project_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub policy_number: String,
    pub policy_type: String,
    pub start_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub guaranteed_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl From<InsuranceRequest> for InsuranceInputType {
    fn from(request: InsuranceRequest) -> Self {
        InsuranceInputType {
            project_id: request.project_id,
            supplier_id: request.supplier_id,
            policy_number: request.policy_number,
            policy_type: request.policy_type,
            start_date: request.start_date,
            expiry_date: request.expiry_date,
            payment_date: request.payment_date,
            guaranteed_amount: request.guaranteed_amount,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceListRequest {
    pub project_id: Option<i64>,
    pub supplier_id: Option<i64>,
}

impl From<InsuranceListRequest> for InsuranceListInputType {
    fn from(request: InsuranceListRequest) -> Self {
        InsuranceListInputType { project_id: request.project_id, supplier_id: request.supplier_id }
    }
}

/***************** Projects *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub code: String,
    pub name: String,
    pub cig: Option<String>,
    pub cup: Option<String>,
    pub manager_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub address: FullAddress,
    pub work_description: Option<String>,
    pub value: Option<Decimal>,
    pub advance_amount: Option<Decimal>,
}

impl From<ProjectRequest> for ProjectInputType {
    fn from(request: ProjectRequest) -> Self {
        ProjectInputType {
            code: request.code,
            name: request.name,
            cig: request.cig,
            cup: request.cup,
            manager_id: request.manager_id,
            start_date: request.start_date,
            end_date: request.end_date,
            status: request.status,
            address: request.address,
            work_description: request.work_description,
            value: request.value,
            advance_amount: request.advance_amount,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListRequest {
    pub status: Option<ProjectStatus>,
    pub keyword: Option<String>,
}

impl From<ProjectListRequest> for ProjectListInputType {
    fn from(request: ProjectListRequest) -> Self {
        ProjectListInputType { status: request.status, keyword: request.keyword }
    }
}

/***************** Correspondence *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrespondenceRequest {
    /**
     * Protocol number, 0 or missing assigns the next free one of the year.
     */
    #[serde(default)]
    pub progressive: i32,
    pub year: Option<i32>,
    pub correspondence_type: CorrespondenceType,
    pub description: Option<String>,
    pub correspondence_date: Option<NaiveDate>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub notes: Option<String>,
}

impl From<CorrespondenceRequest> for CorrespondenceInputType {
    fn from(request: CorrespondenceRequest) -> Self {
        CorrespondenceInputType {
            progressive: request.progressive,
            year: request.year,
            correspondence_type: request.correspondence_type,
            description: request.description,
            correspondence_date: request.correspondence_date,
            sender: request.sender,
            recipient: request.recipient,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrespondenceListRequest {
    pub year: Option<i32>,
    pub correspondence_type: Option<CorrespondenceType>,
    pub keyword: Option<String>,
}

impl From<CorrespondenceListRequest> for CorrespondenceListInputType {
    fn from(request: CorrespondenceListRequest) -> Self {
        CorrespondenceListInputType { year: request.year, correspondence_type: request.correspondence_type, keyword: request.keyword }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastProtocolQuery {
    pub correspondence_type: CorrespondenceType,
}

/**
 * Last registered protocol of a direction, `--` when there is none.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolResponse {
    pub protocol: String,
}

/***************** Compliance *********************/

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceItemRequest {
    pub category: Option<String>,
    pub employee_id: Option<i64>,
    pub project_id: Option<i64>,
    pub description: Option<String>,
    pub visit_date: Option<NaiveDate>,
    /**
     * Months between visits.
     */
    pub periodicity: Option<i32>,
    pub due_date: Option<NaiveDate>,
}

impl From<ComplianceItemRequest> for ComplianceItemInputType {
    fn from(request: ComplianceItemRequest) -> Self {
        ComplianceItemInputType {
            category: request.category,
            employee_id: request.employee_id,
            project_id: request.project_id,
            description: request.description,
            visit_date: request.visit_date,
            periodicity: request.periodicity,
            due_date: request.due_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceItemListRequest {
    pub category: Option<String>,
    pub project_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub expired: Option<bool>,
}

impl From<ComplianceItemListRequest> for ComplianceItemListInputType {
    fn from(request: ComplianceItemListRequest) -> Self {
        ComplianceItemListInputType {
            category: request.category,
            project_id: request.project_id,
            employee_id: request.employee_id,
            due_from: request.due_from,
            due_to: request.due_to,
            expired: request.expired,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingQuery {
    pub days: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_correspondence_progressive_defaults_to_zero() {
        let request: CorrespondenceRequest = serde_json::from_str(r#"{"correspondenceType": "E", "description": "Lettera"}"#).unwrap();
        let input = CorrespondenceInputType::from(request);
        assert_eq!(input.progressive, 0);
        assert_eq!(input.correspondence_type, CorrespondenceType::E);
    }

    #[test]
    fn test_contract_request_accepts_partial_body() {
        let request: ContractRequest = serde_json::from_str(r#"{"supplierId": 4, "contractType": "SERVIZI", "amountNet": "100.50"}"#).unwrap();
        let input = ContractInputType::from(request);
        assert_eq!(input.supplier_id, Some(4));
        assert_eq!(input.amount_net, Some(Decimal::new(10050, 2)));
        assert!(input.subject.is_none());
    }

    #[test]
    fn test_project_address_defaults_to_empty() {
        let request: ProjectRequest = serde_json::from_str(r#"{"code": "P-01", "name": "Scuola", "status": "ACTIVE"}"#).unwrap();
        let input = ProjectInputType::from(request);
        assert_eq!(input.address, FullAddress::default());
        assert_eq!(input.status, Some(ProjectStatus::Active));
    }
}
