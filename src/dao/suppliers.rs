use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        registry::{SupplierDetailType, SupplierInputType, SupplierListInputType},
    },
};

const QUERY_SUPPLIER: &str = "SELECT id, name, vat_number, company_phone, company_email, pec, iban, sdi_code,
                                     street, country_code, country, region_code, region, province_code, province, city_code, city, locality, postal_code
                              FROM suppliers WHERE id = $1";

const QUERY_SUPPLIER_LIST: &str = "SELECT id, name, vat_number, company_phone, company_email, pec, iban, sdi_code,
                                          street, country_code, country, region_code, region, province_code, province, city_code, city, locality, postal_code
                                   FROM suppliers
                                   WHERE ($1::text IS NULL OR lower(name) LIKE $1 OR lower(vat_number) LIKE $1)
                                   ORDER BY name, id
                                   LIMIT $2 OFFSET $3";

const ADD_SUPPLIER: &str = "INSERT INTO suppliers (name, vat_number, company_phone, company_email, pec, iban, sdi_code,
                                                   street, country_code, country, region_code, region, province_code, province, city_code, city, locality, postal_code)
                            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
                            RETURNING id";

const UPDATE_SUPPLIER: &str = "UPDATE suppliers SET name = $1, vat_number = $2, company_phone = $3, company_email = $4, pec = $5, iban = $6, sdi_code = $7, street = $8,
                                                    country_code = $9, country = $10, region_code = $11, region = $12, province_code = $13, province = $14, city_code = $15,
                                                    city = $16, locality = $17, postal_code = $18
                               WHERE id = $19";

const DELETE_SUPPLIER: &str = "DELETE FROM suppliers WHERE id = $1";

const EXISTS_SUPPLIER: &str = "SELECT EXISTS (SELECT 1 FROM suppliers WHERE id = $1)";

/**
 * DAO for supplier database operations.
 */
pub struct SupplierDao {}

impl SupplierDao {
    pub fn new() -> Self {
        SupplierDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_supplier(&self, connection: &mut PgConnection, supplier_id: i64) -> Result<SupplierDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let supplier: Option<SupplierDetailType> = sqlx::query_as(QUERY_SUPPLIER)
            .bind(supplier_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get supplier", &err))?;
        found(supplier, "Supplier", supplier_id)
    }

    /**
     * Retrieves a page of suppliers matching a keyword on name or VAT number.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_supplier_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: SupplierListInputType) -> Result<ListOutputType<SupplierDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<SupplierDetailType> = sqlx::query_as(QUERY_SUPPLIER_LIST)
            .bind(like_pattern(filter.keyword.as_deref()))
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get supplier list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, transaction, supplier_input), fields(result))]
    pub async fn add_supplier(&self, transaction: &mut PgConnection, supplier_input: SupplierInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let address = supplier_input.address;
        let id: (i64,) = sqlx::query_as(ADD_SUPPLIER)
            .bind(supplier_input.name)
            .bind(supplier_input.vat_number)
            .bind(supplier_input.company_phone)
            .bind(supplier_input.company_email)
            .bind(supplier_input.pec)
            .bind(supplier_input.iban)
            .bind(supplier_input.sdi_code)
            .bind(address.street)
            .bind(address.country_code)
            .bind(address.country)
            .bind(address.region_code)
            .bind(address.region)
            .bind(address.province_code)
            .bind(address.province)
            .bind(address.city_code)
            .bind(address.city)
            .bind(address.locality)
            .bind(address.postal_code)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, supplier_input), fields(result))]
    pub async fn update_supplier(&self, transaction: &mut PgConnection, supplier_id: i64, supplier_input: SupplierInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let address = supplier_input.address;
        let result = sqlx::query(UPDATE_SUPPLIER)
            .bind(supplier_input.name)
            .bind(supplier_input.vat_number)
            .bind(supplier_input.company_phone)
            .bind(supplier_input.company_email)
            .bind(supplier_input.pec)
            .bind(supplier_input.iban)
            .bind(supplier_input.sdi_code)
            .bind(address.street)
            .bind(address.country_code)
            .bind(address.country)
            .bind(address.region_code)
            .bind(address.region)
            .bind(address.province_code)
            .bind(address.province)
            .bind(address.city_code)
            .bind(address.city)
            .bind(address.locality)
            .bind(address.postal_code)
            .bind(supplier_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Supplier", supplier_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_supplier(&self, transaction: &mut PgConnection, supplier_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_SUPPLIER)
            .bind(supplier_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Supplier", supplier_id, "deleted")
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn supplier_exists(&self, connection: &mut PgConnection, supplier_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_SUPPLIER)
            .bind(supplier_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check supplier", &err))?;
        Ok(exists.0)
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod integration_test {
    use super::*;
    use crate::{dao::common::integration_test::init_db, model::models::FullAddress};

    pub fn supplier_input(name: &str) -> SupplierInputType {
        SupplierInputType {
            name: name.to_string(),
            vat_number: Some("01234567890".to_string()),
            company_phone: None,
            company_email: None,
            pec: None,
            iban: None,
            sdi_code: None,
            address: FullAddress { city: Some("Roma".to_string()), ..FullAddress::default() },
        }
    }

    #[sqlx::test]
    async fn test_add_update_then_delete_supplier() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let supplier_dao = SupplierDao::new();
        let supplier_id = supplier_dao.add_supplier(&mut transaction, supplier_input("Officina Test")).await.unwrap();
        assert!(supplier_dao.supplier_exists(&mut transaction, supplier_id).await.unwrap());
        supplier_dao.update_supplier(&mut transaction, supplier_id, supplier_input("Officina Test 2")).await.unwrap();
        let supplier = supplier_dao.get_supplier(&mut transaction, supplier_id).await.unwrap();
        assert_eq!(supplier.name, "Officina Test 2");
        assert_eq!(supplier.address.city, Some("Roma".to_string()));
        let list = supplier_dao.get_supplier_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, SupplierListInputType { keyword: Some("officina test 2".to_string()) }).await.unwrap();
        assert!(list.elements.iter().any(|supplier| supplier.id == supplier_id));
        assert!(supplier_dao.delete_supplier(&mut transaction, supplier_id).await.is_ok());
        transaction.rollback().await.unwrap();
    }
}
