use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        registry::{ContractDetailType, ContractListInputType, ContractStatisticsType, ContractValidInputType},
    },
};

const QUERY_CONTRACT: &str = "SELECT c.id, c.supplier_id, c.project_id, c.contract_type, c.subject, c.status, c.start_date, c.end_date, c.termination_notice_days,
                                     c.expiry_reminder, c.amount_net, c.vat_rate, c.currency, c.payment_terms, c.periodic_fee, c.recurring_frequency, c.needs_durc,
                                     c.durc_expiry, c.reference_person, s.name AS supplier_name
                              FROM contracts c
                              LEFT JOIN suppliers s ON s.id = c.supplier_id
                              WHERE c.id = $1";

const QUERY_CONTRACT_LIST: &str = "SELECT c.id, c.supplier_id, c.project_id, c.contract_type, c.subject, c.status, c.start_date, c.end_date, c.termination_notice_days,
                                          c.expiry_reminder, c.amount_net, c.vat_rate, c.currency, c.payment_terms, c.periodic_fee, c.recurring_frequency, c.needs_durc,
                                          c.durc_expiry, c.reference_person, s.name AS supplier_name
                                   FROM contracts c
                                   LEFT JOIN suppliers s ON s.id = c.supplier_id
                                   WHERE ($1::supplier_contract_status IS NULL OR c.status = $1) AND
                                         ($2::bigint IS NULL OR c.supplier_id = $2) AND
                                         ($3::bigint IS NULL OR c.project_id = $3)
                                   ORDER BY c.end_date NULLS LAST, c.id
                                   LIMIT $4 OFFSET $5";

const ADD_CONTRACT: &str = "INSERT INTO contracts (supplier_id, project_id, contract_type, subject, status, start_date, end_date, termination_notice_days, expiry_reminder,
                                                   amount_net, vat_rate, currency, payment_terms, periodic_fee, recurring_frequency, needs_durc, durc_expiry, reference_person)
                            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
                            RETURNING id";

const UPDATE_CONTRACT: &str = "UPDATE contracts SET supplier_id = $1, project_id = $2, contract_type = $3, subject = $4, status = $5, start_date = $6, end_date = $7,
                                                    termination_notice_days = $8, expiry_reminder = $9, amount_net = $10, vat_rate = $11, currency = $12, payment_terms = $13,
                                                    periodic_fee = $14, recurring_frequency = $15, needs_durc = $16, durc_expiry = $17, reference_person = $18
                               WHERE id = $19";

const DELETE_CONTRACT: &str = "DELETE FROM contracts WHERE id = $1";

/**
 * Expiring contracts are in execution and end within their notice period.
 * Expired contracts are marked SCADUTO or are in execution past their end date.
 */
const QUERY_CONTRACT_STATISTICS: &str = "SELECT
                                             count(*) FILTER (WHERE status = 'BOZZA') AS draft,
                                             count(*) FILTER (WHERE status = 'IN_ESECUZIONE') AS active,
                                             count(*) FILTER (WHERE status = 'IN_ESECUZIONE' AND end_date IS NOT NULL AND end_date >= $1
                                                              AND end_date <= $1 + COALESCE(termination_notice_days, 0)) AS expiring,
                                             count(*) FILTER (WHERE status = 'SCADUTO' OR (status = 'IN_ESECUZIONE' AND end_date < $1)) AS expired
                                         FROM contracts";

/**
 * DAO for supplier contract database operations.
 */
pub struct ContractDao {}

impl ContractDao {
    pub fn new() -> Self {
        ContractDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_contract(&self, connection: &mut PgConnection, contract_id: i64) -> Result<ContractDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let contract: Option<ContractDetailType> = sqlx::query_as(QUERY_CONTRACT)
            .bind(contract_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get contract", &err))?;
        found(contract, "Contract", contract_id).map(ContractDetailType::with_derived_values)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_contract_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: ContractListInputType) -> Result<ListOutputType<ContractDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<ContractDetailType> = sqlx::query_as(QUERY_CONTRACT_LIST)
            .bind(filter.status)
            .bind(filter.supplier_id)
            .bind(filter.project_id)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get contract list", &err))?;
        to_list_output(&pagination_input, elements.into_iter().map(ContractDetailType::with_derived_values).collect())
    }

    #[instrument(skip(self, transaction, contract_input), fields(result))]
    pub async fn add_contract(&self, transaction: &mut PgConnection, contract_input: ContractValidInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_CONTRACT)
            .bind(contract_input.supplier_id)
            .bind(contract_input.project_id)
            .bind(contract_input.contract_type)
            .bind(contract_input.subject)
            .bind(contract_input.status)
            .bind(contract_input.start_date)
            .bind(contract_input.end_date)
            .bind(contract_input.termination_notice_days)
            .bind(contract_input.expiry_reminder)
            .bind(contract_input.amount_net)
            .bind(contract_input.vat_rate)
            .bind(contract_input.currency)
            .bind(contract_input.payment_terms)
            .bind(contract_input.periodic_fee)
            .bind(contract_input.recurring_frequency)
            .bind(contract_input.needs_durc)
            .bind(contract_input.durc_expiry)
            .bind(contract_input.reference_person)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, contract_input), fields(result))]
    pub async fn update_contract(&self, transaction: &mut PgConnection, contract_id: i64, contract_input: ContractValidInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_CONTRACT)
            .bind(contract_input.supplier_id)
            .bind(contract_input.project_id)
            .bind(contract_input.contract_type)
            .bind(contract_input.subject)
            .bind(contract_input.status)
            .bind(contract_input.start_date)
            .bind(contract_input.end_date)
            .bind(contract_input.termination_notice_days)
            .bind(contract_input.expiry_reminder)
            .bind(contract_input.amount_net)
            .bind(contract_input.vat_rate)
            .bind(contract_input.currency)
            .bind(contract_input.payment_terms)
            .bind(contract_input.periodic_fee)
            .bind(contract_input.recurring_frequency)
            .bind(contract_input.needs_durc)
            .bind(contract_input.durc_expiry)
            .bind(contract_input.reference_person)
            .bind(contract_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Contract", contract_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_contract(&self, transaction: &mut PgConnection, contract_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_CONTRACT)
            .bind(contract_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Contract", contract_id, "deleted")
    }

    /**
     * Counts contracts that are drafts, active, expiring and expired.
     *
     * # Arguments
     * `connection`: The database connection.
     * `today`: Reference date for expiry.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_contract_statistics(&self, connection: &mut PgConnection, today: NaiveDate) -> Result<ContractStatisticsType, ApplicationError> {
        let span = tracing::Span::current();
        let counts: (i64, i64, i64, i64) = sqlx::query_as(QUERY_CONTRACT_STATISTICS)
            .bind(today)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get contract statistics", &err))?;
        Ok(ContractStatisticsType { draft: counts.0, active: counts.1, expiring: counts.2, expired: counts.3 })
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::common::integration_test::init_db,
        model::{
            enums::{SupplierContractStatus, SupplierContractType},
            registry::ContractInputType,
        },
    };
    use chrono::Days;
    use rust_decimal::Decimal;

    fn contract_input(status: SupplierContractStatus, end_date: Option<NaiveDate>) -> ContractValidInputType {
        ContractInputType {
            contract_type: Some(SupplierContractType::Servizi),
            subject: Some("Pulizie uffici".to_string()),
            status: Some(status),
            end_date,
            termination_notice_days: Some(30),
            amount_net: Some(Decimal::new(1000, 0)),
            vat_rate: Some(Decimal::new(22, 0)),
            ..ContractInputType::default()
        }
        .validate()
        .unwrap()
    }

    #[sqlx::test]
    async fn test_add_update_then_delete_contract() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let contract_dao = ContractDao::new();
        let contract_id = contract_dao.add_contract(&mut transaction, contract_input(SupplierContractStatus::Bozza, None)).await.unwrap();
        let contract = contract_dao.get_contract(&mut transaction, contract_id).await.unwrap();
        assert_eq!(contract.amount_gross, Decimal::new(1220, 0));
        contract_dao.update_contract(&mut transaction, contract_id, contract_input(SupplierContractStatus::InEsecuzione, None)).await.unwrap();
        assert_eq!(contract_dao.get_contract(&mut transaction, contract_id).await.unwrap().status, SupplierContractStatus::InEsecuzione);
        assert!(contract_dao.delete_contract(&mut transaction, contract_id).await.is_ok());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_contract_statistics() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let contract_dao = ContractDao::new();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let before = contract_dao.get_contract_statistics(&mut transaction, today).await.unwrap();
        contract_dao.add_contract(&mut transaction, contract_input(SupplierContractStatus::Bozza, None)).await.unwrap();
        contract_dao.add_contract(&mut transaction, contract_input(SupplierContractStatus::InEsecuzione, today.checked_add_days(Days::new(10)))).await.unwrap();
        contract_dao.add_contract(&mut transaction, contract_input(SupplierContractStatus::InEsecuzione, today.checked_sub_days(Days::new(1)))).await.unwrap();
        let after = contract_dao.get_contract_statistics(&mut transaction, today).await.unwrap();
        assert_eq!(after.draft - before.draft, 1);
        assert_eq!(after.active - before.active, 2);
        assert_eq!(after.expiring - before.expiring, 1);
        assert_eq!(after.expired - before.expired, 1);
        transaction.rollback().await.unwrap();
    }
}
