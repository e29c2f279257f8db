use crate::shared::schema::core::users;

diesel::table! {
    companies (id) {
        id -> Uuid,
        name -> Varchar,
        memo -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    company_sites (id) {
        id -> Uuid,
        company_id -> Uuid,
        domain -> Varchar,
        admin_url -> Varchar,
        admin_id -> Varchar,
        admin_pw -> Varchar,
        hosting_company -> Varchar,
        hosting_expire_at -> Nullable<Date>,
        domain_registrar -> Varchar,
        domain_expire_at -> Nullable<Date>,
        memo -> Text,
    }
}

diesel::table! {
    company_tags (id) {
        id -> Uuid,
        company_id -> Uuid,
        name -> Varchar,
    }
}

diesel::table! {
    company_memos (id) {
        id -> Uuid,
        company_id -> Uuid,
        author_id -> Nullable<Uuid>,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(company_sites -> companies (company_id));
diesel::joinable!(company_tags -> companies (company_id));
diesel::joinable!(company_memos -> companies (company_id));
diesel::joinable!(company_memos -> users (author_id));

diesel::allow_tables_to_appear_in_same_query!(companies, company_sites);
diesel::allow_tables_to_appear_in_same_query!(companies, company_tags);
diesel::allow_tables_to_appear_in_same_query!(companies, company_memos);
diesel::allow_tables_to_appear_in_same_query!(company_memos, users);
