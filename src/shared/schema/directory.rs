use crate::shared::schema::core::users;

diesel::table! {
    teams (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Varchar,
    }
}

diesel::table! {
    employees (id) {
        id -> Uuid,
        user_id -> Uuid,
        team_id -> Nullable<Uuid>,
        position -> Varchar,
        phone -> Varchar,
    }
}

diesel::joinable!(employees -> users (user_id));
diesel::joinable!(employees -> teams (team_id));

diesel::allow_tables_to_appear_in_same_query!(employees, users);
diesel::allow_tables_to_appear_in_same_query!(employees, teams);
