//! Diesel table definitions. Must match `backend/migrations`.

diesel::table! {
    /// Registered users.
    users (id) {
        /// Primary key: UUID v4, generated by the application.
        id -> Uuid,
        /// Unique, trimmed login name.
        username -> Text,
        /// Gateway consumer id, written once provisioning completes.
        external_credential_id -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Queue messages leased with a visibility timeout.
    queue_messages (id) {
        id -> Uuid,
        /// Logical queue; several queues may share the table.
        queue_name -> Text,
        body -> Text,
        /// Handle of the most recent delivery, if any.
        receipt_handle -> Nullable<Uuid>,
        receive_count -> Int4,
        /// The row is receivable once this instant has passed.
        visible_at -> Timestamptz,
        enqueued_at -> Timestamptz,
    }
}
