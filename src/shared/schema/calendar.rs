use crate::shared::schema::companies;
use crate::shared::schema::core::users;
use crate::shared::schema::directory::employees;

diesel::table! {
    calendar_events (id) {
        id -> Uuid,
        event_type -> Varchar,
        title -> Varchar,
        description -> Text,
        start_at -> Timestamptz,
        end_at -> Nullable<Timestamptz>,
        company_id -> Nullable<Uuid>,
        employee_id -> Nullable<Uuid>,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(calendar_events -> companies (company_id));
diesel::joinable!(calendar_events -> employees (employee_id));
diesel::joinable!(calendar_events -> users (created_by));

diesel::allow_tables_to_appear_in_same_query!(calendar_events, companies);
diesel::allow_tables_to_appear_in_same_query!(calendar_events, employees);
diesel::allow_tables_to_appear_in_same_query!(calendar_events, users);
