//! Esquema Diesel de las tablas de certflow. Debe coincidir con `migrations/`.

diesel::table! {
    workflow_output (id) {
        id -> Text,
        workflow_id -> Text,
        run_id -> Text,
        node_id -> Text,
        node -> Jsonb,
        outputs -> Jsonb,
        succeeded -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    certificate (id) {
        id -> Text,
        source -> Text,
        subject_alt_names -> Jsonb,
        serial_number -> Text,
        issuer_org -> Nullable<Text>,
        key_algorithm -> Text,
        certificate_pem -> Text,
        private_key -> Text,
        effect_at -> Timestamptz,
        expire_at -> Timestamptz,
        fingerprint -> Text,
        workflow_id -> Nullable<Text>,
        workflow_run_id -> Nullable<Text>,
        workflow_node_id -> Nullable<Text>,
        workflow_output_id -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    workflow_run (id) {
        id -> Text,
        workflow_id -> Text,
        status -> Text,
        trigger -> Text,
        started_at -> Nullable<Timestamptz>,
        ended_at -> Nullable<Timestamptz>,
        logs -> Jsonb,
        error -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(workflow_output, certificate, workflow_run,);
