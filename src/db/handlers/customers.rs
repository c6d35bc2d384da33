//! Database repository for customer profiles.

use crate::api::models::customers::MembershipTier;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::customers::{CustomerCreateDBRequest, CustomerDBResponse, CustomerUpdateDBRequest},
};
use crate::types::{CustomerId, Operation, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing customers
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub skip: i64,
    pub limit: i64,
    pub membership: Option<MembershipTier>,
}

impl CustomerFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_membership(mut self, membership: MembershipTier) -> Self {
        self.membership = Some(membership);
        self
    }
}

pub struct Customers<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Customers<'c> {
    type CreateRequest = CustomerCreateDBRequest;
    type UpdateRequest = CustomerUpdateDBRequest;
    type Response = CustomerDBResponse;
    type Id = CustomerId;
    type Filter = CustomerFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            INSERT INTO customers (user_id, phone, birth_date)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(&request.phone)
        .bind(request.birth_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(customer)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(customer)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Referential guard: a customer with orders cannot be deleted
        let orders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        if orders > 0 {
            return Err(DbError::ProtectedEntity {
                operation: Operation::DeleteAll,
                reason: format!("{orders} order(s) still reference it"),
                entity_type: "Customer".to_string(),
                entity_id: Some(id.to_string()),
            });
        }

        let result = sqlx::query("DELETE FROM customers WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            UPDATE customers SET
                phone = COALESCE($2, phone),
                birth_date = COALESCE($3, birth_date),
                membership = COALESCE($4, membership)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.phone)
        .bind(request.birth_date)
        .bind(request.membership)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(customer)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT * FROM customers WHERE 1=1");
        if let Some(membership) = filter.membership {
            query.push(" AND membership = ");
            query.push_bind(membership);
        }
        query.push(" ORDER BY id LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let customers = query.build_query_as::<CustomerDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(customers)
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM customers WHERE 1=1");
        if let Some(membership) = filter.membership {
            query.push(" AND membership = ");
            query.push_bind(membership);
        }

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

impl<'c> Customers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up the customer profile for a user.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_by_user_id(&mut self, user_id: UserId) -> Result<Option<CustomerDBResponse>> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>("SELECT * FROM customers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(customer)
    }

    /// Fetch the customer profile for a user, creating an empty one on first use.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_or_create_for_user(&mut self, user_id: UserId) -> Result<CustomerDBResponse> {
        if let Some(existing) = self.get_by_user_id(user_id).await? {
            return Ok(existing);
        }

        self.create(&CustomerCreateDBRequest {
            user_id,
            phone: None,
            birth_date: None,
        })
        .await
    }
}
