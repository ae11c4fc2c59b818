use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "vehicle_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    InService,
    Assigned,
    UnderMaintenance,
    OutOfService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "vehicle_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Car,
    Truck,
    Worksite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "fuel_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
    Lpg,
    Methane,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "ownership_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipType {
    Owned,
    Leased,
    Rented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "gender", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "marital_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
    Separated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "education_level", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EducationLevel {
    PrimarySchool,
    MiddleSchool,
    HighSchool,
    Bachelor,
    Master,
    Doctorate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "employment_contract_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    Permanent,
    FixedTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "ccnl_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CcnlType {
    Metalmeccanici,
    Commercio,
    Edilizia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "employment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    Active,
    OnLeave,
    Suspended,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "assignment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Assigned,
    Returned,
    Booked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "expense_status")]
pub enum ExpenseStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    PaySlip,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payslip_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayslipStatus {
    Pending,
    Sent,
    Unmatched,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "supplier_contract_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierContractType {
    Fornitura,
    Servizi,
    Lavori,
    Noleggio,
    Consulenza,
    Altro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "supplier_contract_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierContractStatus {
    Bozza,
    InApprovazione,
    InEsecuzione,
    Sospeso,
    Scaduto,
    Recesso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "currency_code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyCode {
    Eur,
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "recurring_frequency", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringFrequency {
    Mensile,
    Trimestrale,
    Annuale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planned,
    Active,
    Suspended,
    Closed,
}

/**
 * Direction of a correspondence record: E incoming, U outgoing.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "correspondence_type")]
pub enum CorrespondenceType {
    E,
    U,
}

/**
 * Kind of a stored document.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "document_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    VehicleRegistration,
    Insurance,
    Maintenance,
    VehicleImage,
    LeaseContract,
    MaintReport,
    MaintInvoice,
    SupplierContract,
    Correspondence,
    Durc,
    EmploymentContract,
    PayRise,
    Extension,
    Unilav,
    TransferOrder,
    DisciplinaryLetter,
    TaxDeductions,
    IdentityPhoto,
    IdentityDocument,
    FiscalCode,
    Sap,
    Grade,
    AssignmentPhoto,
    AssignmentReport,
    AssignmentLetter,
    Invoice,
    Receipt,
    Certificate,
    Medical,
    Ppe,
    CompanyLogo,
    Other,
}

impl DocumentType {
    /**
     * Human readable name of the document type.
     */
    pub fn display_name(self) -> &'static str {
        match self {
            DocumentType::VehicleRegistration => "Libretto di circolazione",
            DocumentType::Insurance => "Assicurazione",
            DocumentType::Maintenance => "Manutenzione",
            DocumentType::VehicleImage => "Immagine veicolo",
            DocumentType::LeaseContract => "Contratto di noleggio",
            DocumentType::MaintReport => "Rapporto di manutenzione",
            DocumentType::MaintInvoice => "Fattura di manutenzione",
            DocumentType::SupplierContract => "Contratto fornitore",
            DocumentType::Correspondence => "Corrispondenza",
            DocumentType::Durc => "DURC",
            DocumentType::EmploymentContract => "Contratto di lavoro",
            DocumentType::PayRise => "Aumento retributivo",
            DocumentType::Extension => "Proroga",
            DocumentType::Unilav => "UNILAV",
            DocumentType::TransferOrder => "Ordine di trasferimento",
            DocumentType::DisciplinaryLetter => "Lettera disciplinare",
            DocumentType::TaxDeductions => "Detrazioni fiscali",
            DocumentType::IdentityPhoto => "Foto profilo",
            DocumentType::IdentityDocument => "Documento di identità",
            DocumentType::FiscalCode => "Codice fiscale",
            DocumentType::Sap => "SAP",
            DocumentType::Grade => "Titolo di studio",
            DocumentType::AssignmentPhoto => "Foto assegnazione",
            DocumentType::AssignmentReport => "Verbale di assegnazione",
            DocumentType::AssignmentLetter => "Lettera di assegnazione",
            DocumentType::Invoice => "Fattura",
            DocumentType::Receipt => "Ricevuta",
            DocumentType::Certificate => "Certificato",
            DocumentType::Medical => "Visita medica",
            DocumentType::Ppe => "DPI",
            DocumentType::CompanyLogo => "Logo aziendale",
            DocumentType::Other => "Altro",
        }
    }

    /**
     * Whether files of this type must be images.
     */
    pub fn is_image(self) -> bool {
        matches!(self, DocumentType::VehicleImage | DocumentType::IdentityPhoto | DocumentType::AssignmentPhoto | DocumentType::CompanyLogo)
    }
}

/**
 * Kind of entity owning a document.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "document_owner_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentOwnerType {
    Employee,
    Employment,
    Vehicle,
    Assignment,
    Maintenance,
    Project,
    Insurance,
    Contract,
    Supplier,
    Correspondence,
    ExpenseItem,
    ComplianceItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    Closed,
}

/**
 * Where a mileage reading came from.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "mileage_source", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MileageSource {
    Vehicle,
    Maintenance,
    Refuel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Planned,
    Confirmed,
    Completed,
    Cancelled,
}

impl std::str::FromStr for DocumentOwnerType {
    type Err = ();

    /**
     * Parses the owner type used in URL paths, e.g. `employees` or `expense-items`.
     */
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "employees" => Ok(DocumentOwnerType::Employee),
            "employments" => Ok(DocumentOwnerType::Employment),
            "vehicles" => Ok(DocumentOwnerType::Vehicle),
            "assignments" => Ok(DocumentOwnerType::Assignment),
            "maintenance" => Ok(DocumentOwnerType::Maintenance),
            "projects" => Ok(DocumentOwnerType::Project),
            "insurances" => Ok(DocumentOwnerType::Insurance),
            "contracts" => Ok(DocumentOwnerType::Contract),
            "suppliers" => Ok(DocumentOwnerType::Supplier),
            "correspondence" => Ok(DocumentOwnerType::Correspondence),
            "expense-items" => Ok(DocumentOwnerType::ExpenseItem),
            "compliance-items" => Ok(DocumentOwnerType::ComplianceItem),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_owner_type_from_path() {
        assert_eq!(DocumentOwnerType::from_str("expense-items"), Ok(DocumentOwnerType::ExpenseItem));
        assert_eq!(DocumentOwnerType::from_str("vehicles"), Ok(DocumentOwnerType::Vehicle));
        assert!(DocumentOwnerType::from_str("../etc").is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&VehicleStatus::UnderMaintenance).unwrap(), "\"UNDER_MAINTENANCE\"");
        assert_eq!(serde_json::to_string(&ExpenseStatus::Draft).unwrap(), "\"Draft\"");
        assert_eq!(serde_json::from_str::<SupplierContractStatus>("\"IN_ESECUZIONE\"").unwrap(), SupplierContractStatus::InEsecuzione);
        assert_eq!(serde_json::to_string(&BookingStatus::Cancelled).unwrap(), "\"CANCELLED\"");
    }

    #[test]
    fn test_image_document_types() {
        assert!(DocumentType::IdentityPhoto.is_image());
        assert!(!DocumentType::Invoice.is_image());
        assert_eq!(DocumentType::Durc.display_name(), "DURC");
    }
}
