//! Business error taxonomy for stock, batch, routing and inspection rules
//!
//! Every rule violation names the offending entity and, where it applies,
//! the available and requested amounts.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used by transport layers to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An id did not resolve to an entity
    NotFound,
    /// The request is well-formed but breaks a business rule
    Conflict,
}

/// Domain errors raised by the stock engine and the production workflow
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    // Stock ledger
    #[error("Invalid weight {weight}kg: weights must not be negative and movements must be at least 0.001kg")]
    InvalidWeight { weight: Decimal },

    #[error("Roll {0} not found")]
    RollNotFound(Uuid),

    #[error("Roll {roll_id} does not have enough weight. Available: {available}kg, Requested: {requested}kg")]
    InsufficientStock {
        roll_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Roll {roll_id} would exceed its initial weight of {initial}kg (requested {requested}kg)")]
    WeightAboveInitial {
        roll_id: Uuid,
        initial: Decimal,
        requested: Decimal,
    },

    #[error("Movement {0} not found")]
    MovementNotFound(Uuid),

    #[error("A roll with barcode {0} already exists")]
    DuplicateBarcode(String),

    #[error("Roll {0} has stock movements and cannot be deleted")]
    RollHasMovements(Uuid),

    #[error("Roll {roll_id} cannot be marked {status} while holding {weight}kg")]
    InvalidRollStatus {
        roll_id: Uuid,
        status: String,
        weight: Decimal,
    },

    // Reservations
    #[error("Roll {roll_id} does not belong to color {declared_color_id} (actual color {actual_color_id})")]
    ColorMismatch {
        roll_id: Uuid,
        declared_color_id: Uuid,
        actual_color_id: Uuid,
    },

    #[error("At least one roll reservation is required")]
    NoReservationProvided,

    #[error("Roll {roll_id} belongs to fabric {found_fabric_id}, but the batch rolls belong to fabric {expected_fabric_id}")]
    RollsSpanMultipleFabrics {
        roll_id: Uuid,
        expected_fabric_id: Uuid,
        found_fabric_id: Uuid,
    },

    #[error("Roll {roll_id} belongs to fabric {roll_fabric_id}, not to the batch fabric {batch_fabric_id}")]
    FabricMismatch {
        roll_id: Uuid,
        batch_fabric_id: Uuid,
        roll_fabric_id: Uuid,
    },

    #[error("Every spread must declare at least one {missing}")]
    EmptySpread { missing: &'static str },

    // Batches
    #[error("A batch with code {0} already exists")]
    DuplicateBatchCode(String),

    #[error("Batch {0} not found")]
    BatchNotFound(Uuid),

    #[error("Batch {batch_id} is {status}; items can no longer be added")]
    BatchClosed { batch_id: Uuid, status: String },

    #[error("Batch {0} has routings and cannot be deleted")]
    BatchHasRoutings(Uuid),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("An acting user is required to record automatic stock movements")]
    ActorRequired,

    #[error("Roll consumption is only accepted when a batch moves from planejado to em_producao")]
    ConsumptionNotAllowed,

    // Reference data lookups
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Fabric {0} not found")]
    FabricNotFound(Uuid),

    #[error("Products not found: {}", join_ids(.0))]
    ProductNotFound(Vec<Uuid>),

    #[error("Sizes not found: {}", join_ids(.0))]
    SizeNotFound(Vec<Uuid>),

    // Routing and inspection
    #[error("Faction {0} not found")]
    FactionNotFound(Uuid),

    #[error("Faction {0} is inactive and cannot receive routings")]
    FactionInactive(Uuid),

    #[error("Routing {0} not found")]
    RoutingNotFound(Uuid),

    #[error("Routing {0} has conferences and cannot be deleted")]
    RoutingHasConferences(Uuid),

    #[error("Conference {0} not found")]
    ConferenceNotFound(Uuid),

    #[error("Payment cannot be released while quality status is {quality_status}")]
    PaymentReleaseNotAllowed { quality_status: String },

    #[error("Size {size_id}: defect quantity {defects} exceeds received quantity {received}")]
    DefectsExceedReceived {
        size_id: Uuid,
        received: i32,
        defects: i32,
    },
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl DomainError {
    /// Classify the error for transport mapping
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::RollNotFound(_)
            | DomainError::MovementNotFound(_)
            | DomainError::BatchNotFound(_)
            | DomainError::UserNotFound(_)
            | DomainError::FabricNotFound(_)
            | DomainError::ProductNotFound(_)
            | DomainError::SizeNotFound(_)
            | DomainError::FactionNotFound(_)
            | DomainError::RoutingNotFound(_)
            | DomainError::ConferenceNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Conflict,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidWeight { .. } => "INVALID_WEIGHT",
            DomainError::RollNotFound(_) => "ROLL_NOT_FOUND",
            DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            DomainError::WeightAboveInitial { .. } => "WEIGHT_ABOVE_INITIAL",
            DomainError::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            DomainError::DuplicateBarcode(_) => "DUPLICATE_BARCODE",
            DomainError::RollHasMovements(_) => "ROLL_HAS_MOVEMENTS",
            DomainError::InvalidRollStatus { .. } => "INVALID_ROLL_STATUS",
            DomainError::ColorMismatch { .. } => "COLOR_MISMATCH",
            DomainError::NoReservationProvided => "NO_RESERVATION_PROVIDED",
            DomainError::RollsSpanMultipleFabrics { .. } => "ROLLS_SPAN_MULTIPLE_FABRICS",
            DomainError::FabricMismatch { .. } => "FABRIC_MISMATCH",
            DomainError::EmptySpread { .. } => "EMPTY_SPREAD",
            DomainError::DuplicateBatchCode(_) => "DUPLICATE_BATCH_CODE",
            DomainError::BatchNotFound(_) => "BATCH_NOT_FOUND",
            DomainError::BatchClosed { .. } => "BATCH_CLOSED",
            DomainError::BatchHasRoutings(_) => "BATCH_HAS_ROUTINGS",
            DomainError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            DomainError::ActorRequired => "ACTOR_REQUIRED",
            DomainError::ConsumptionNotAllowed => "CONSUMPTION_NOT_ALLOWED",
            DomainError::UserNotFound(_) => "USER_NOT_FOUND",
            DomainError::FabricNotFound(_) => "FABRIC_NOT_FOUND",
            DomainError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            DomainError::SizeNotFound(_) => "SIZE_NOT_FOUND",
            DomainError::FactionNotFound(_) => "FACTION_NOT_FOUND",
            DomainError::FactionInactive(_) => "FACTION_INACTIVE",
            DomainError::RoutingNotFound(_) => "ROUTING_NOT_FOUND",
            DomainError::RoutingHasConferences(_) => "ROUTING_HAS_CONFERENCES",
            DomainError::ConferenceNotFound(_) => "CONFERENCE_NOT_FOUND",
            DomainError::PaymentReleaseNotAllowed { .. } => "PAYMENT_RELEASE_NOT_ALLOWED",
            DomainError::DefectsExceedReceived { .. } => "DEFECTS_EXCEED_RECEIVED",
        }
    }

    /// Portuguese message shown to shop-floor users
    pub fn message_pt(&self) -> String {
        match self {
            DomainError::InvalidWeight { weight } => {
                format!("Peso inválido: {}kg. O peso não pode ser negativo e cada movimentação deve ter ao menos 0,001kg.", weight)
            }
            DomainError::RollNotFound(id) => format!("Rolo {} não encontrado.", id),
            DomainError::InsufficientStock {
                roll_id,
                available,
                requested,
            } => format!(
                "Rolo {} não tem peso suficiente. Disponível: {}kg, Solicitado: {}kg",
                roll_id, available, requested
            ),
            DomainError::WeightAboveInitial {
                roll_id,
                initial,
                requested,
            } => format!(
                "Rolo {} ultrapassaria o peso inicial de {}kg (solicitado {}kg).",
                roll_id, initial, requested
            ),
            DomainError::MovementNotFound(id) => format!("Movimentação {} não encontrada.", id),
            DomainError::DuplicateBarcode(code) => {
                format!("Já existe um rolo com o código de barra {}.", code)
            }
            DomainError::RollHasMovements(id) => format!(
                "Não é possível deletar o rolo {} pois ele possui movimentações associadas.",
                id
            ),
            DomainError::InvalidRollStatus {
                roll_id,
                status,
                weight,
            } => format!(
                "Rolo {} não pode ficar com situação {} com {}kg.",
                roll_id, status, weight
            ),
            DomainError::ColorMismatch { roll_id, .. } => {
                format!("Rolo {} não pertence à cor informada no enfesto.", roll_id)
            }
            DomainError::NoReservationProvided => {
                "É necessário informar ao menos um rolo.".to_string()
            }
            DomainError::RollsSpanMultipleFabrics { roll_id, .. } => format!(
                "Rolo {} é de um tecido diferente dos demais rolos do lote.",
                roll_id
            ),
            DomainError::FabricMismatch { roll_id, .. } => {
                format!("Rolo {} não pertence ao tecido do lote.", roll_id)
            }
            DomainError::EmptySpread { missing } => {
                format!("Todos os enfestos devem informar ao menos um {}.", missing)
            }
            DomainError::DuplicateBatchCode(code) => {
                format!("Lote com o código {} já existe.", code)
            }
            DomainError::BatchNotFound(id) => format!("Lote {} não encontrado.", id),
            DomainError::BatchClosed { status, .. } => format!(
                "Não é possível adicionar items a um lote {}.",
                status
            ),
            DomainError::BatchHasRoutings(id) => format!(
                "Não é possível deletar o lote {} pois ele possui direcionamentos associados.",
                id
            ),
            DomainError::InvalidStatusTransition { from, to } => {
                format!("Não é permitido mudar status de '{}' para '{}'.", from, to)
            }
            DomainError::ActorRequired => {
                "Usuário é obrigatório para registrar movimentações automáticas.".to_string()
            }
            DomainError::ConsumptionNotAllowed => {
                "Consumo de rolos só é aceito na passagem de planejado para em_producao."
                    .to_string()
            }
            DomainError::UserNotFound(id) => format!("Usuário {} não encontrado.", id),
            DomainError::FabricNotFound(id) => format!("Tecido {} não encontrado.", id),
            DomainError::ProductNotFound(ids) => {
                format!("Produtos não encontrados: {}.", join_ids(ids))
            }
            DomainError::SizeNotFound(ids) => {
                format!("Tamanhos não encontrados: {}.", join_ids(ids))
            }
            DomainError::FactionNotFound(id) => format!("Facção {} não encontrada.", id),
            DomainError::FactionInactive(_) => {
                "Facção inativa. Não é possível enviar direcionamentos.".to_string()
            }
            DomainError::RoutingNotFound(id) => format!("Direcionamento {} não encontrado.", id),
            DomainError::RoutingHasConferences(id) => format!(
                "Não é possível deletar o direcionamento {} pois ele possui conferências associadas.",
                id
            ),
            DomainError::ConferenceNotFound(id) => format!("Conferência {} não encontrada.", id),
            DomainError::PaymentReleaseNotAllowed { .. } => {
                "Não é possível liberar pagamento para conferências não conforme.".to_string()
            }
            DomainError::DefectsExceedReceived { size_id, .. } => format!(
                "Tamanho {}: quantidade com defeito maior que a recebida.",
                size_id
            ),
        }
    }
}

/// Result alias for pure domain operations
pub type DomainResult<T> = Result<T, DomainError>;
