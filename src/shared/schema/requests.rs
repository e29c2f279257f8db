use crate::shared::schema::companies;
use crate::shared::schema::directory::employees;

diesel::table! {
    company_requests (id) {
        id -> Uuid,
        company_id -> Uuid,
        assignee_id -> Nullable<Uuid>,
        title -> Varchar,
        description -> Text,
        status -> Varchar,
        requested_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(company_requests -> companies (company_id));
diesel::joinable!(company_requests -> employees (assignee_id));

diesel::allow_tables_to_appear_in_same_query!(company_requests, companies);
diesel::allow_tables_to_appear_in_same_query!(company_requests, employees);
