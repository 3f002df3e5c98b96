//! This module interacts with the transfer endpoints of the monitor API.
//!
//! It provides functionality to:
//! - Record transfers against a customer and edit or rescore recorded
//!   transfers.
//! - List a customer's transfers with paging, ordering and filtering.
//! - Retrieve the filtering bounds of a customer's transfers.
//! - Apply an action to all of a customer's transfers matching a filter.
//!
//! The monitor API expects the parameters of these endpoints in the query
//! string, also for POST requests. Optional parameters that are not given
//! are left out of the query string entirely so that the server applies
//! its documented defaults.

use std::future::Future;
use std::str::FromStr;

use reqwest::Method;
use serde::Serialize;

use crate::client::Envelope;
use crate::client::MonitorClient;
use crate::error::Error;
use crate::filter::TransferFilter;

/// The smallest page size accepted by the transfer listing endpoint.
pub const MIN_PAGE_LIMIT: u32 = 1;

/// The largest page size accepted by the transfer listing endpoint.
pub const MAX_PAGE_LIMIT: u32 = 20_000;

/// The direction of a transfer relative to the customer's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display, strum::EnumString, strum::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferDirection {
    /// Funds arriving at the customer's address.
    Deposit,
    /// Funds leaving the customer's address.
    Withdrawal,
}

impl TransferDirection {
    /// Parse the wire form of a transfer direction.
    pub fn parse(value: &str) -> Result<Self, Error> {
        parse_param("direction", value)
    }
}

/// The flag states that a transfer can be moved into.
///
/// The monitor API has been observed to accept and then ignore this
/// parameter. It is kept because the API still documents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display, strum::EnumString, strum::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlagUpdate {
    /// Mark the transfer as flagged.
    Flag,
    /// Clear the flag from the transfer.
    Unflag,
}

impl FlagUpdate {
    /// Parse the wire form of a flag update.
    pub fn parse(value: &str) -> Result<Self, Error> {
        parse_param("flagged", value)
    }
}

/// The sort keys accepted by the transfer listing endpoint. The server
/// sorts by [`TransferOrder::UpdatedAt`] when no key is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display, strum::EnumString, strum::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferOrder {
    /// Sort by the transferred amount in the transferred currency.
    Amount,
    /// Sort by the transferred amount in the configured fiat currency.
    Fiat,
    /// Sort by the block time of the underlying transaction.
    Time,
    /// Sort by the time the transfer was recorded.
    CreatedAt,
    /// Sort by the time the transfer last changed.
    UpdatedAt,
    /// Sort by the riskscore assigned to the transfer.
    Riskscore,
}

impl TransferOrder {
    /// Parse the wire form of a transfer sort key.
    pub fn parse(value: &str) -> Result<Self, Error> {
        parse_param("order", value)
    }
}

/// The direction in which a transfer listing is sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display, strum::EnumString, strum::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortDirection {
    /// Smallest values first.
    Asc,
    /// Largest values first.
    Desc,
}

impl SortDirection {
    /// Parse the wire form of a sort direction.
    pub fn parse(value: &str) -> Result<Self, Error> {
        parse_param("direction", value)
    }
}

/// The actions that can be applied to all transfers matching a filter
/// through the bulk edit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display, strum::EnumString, strum::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BulkAction {
    /// Schedule the matching transfers for rescoring.
    Schedule,
    /// Move the matching transfers into the archive.
    Archive,
    /// Restore the matching transfers from the archive.
    Unarchive,
    /// Mark the matching transfers as flagged.
    Flag,
    /// Clear the flag from the matching transfers.
    Unflag,
}

impl BulkAction {
    /// Parse the wire form of a bulk edit action.
    pub fn parse(value: &str) -> Result<Self, Error> {
        parse_param("action", value)
    }
}

/// The changes to apply to a recorded transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferUpdate {
    /// Move the transfer into the archive (`true`) or restore it from the
    /// archive (`false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    /// Flag or unflag the transfer. See [`FlagUpdate`] for a caveat on
    /// how the server treats this parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged: Option<FlagUpdate>,
}

/// The optional parameters of the transfer listing endpoint. The server
/// substitutes its documented default for every parameter left as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTransfersQuery {
    /// Ask the server to include the total number of matching transfers
    /// in the response meta. Sent as `1` or `0` on the wire.
    pub with_total: Option<bool>,
    /// The number of matching transfers to skip before the first returned
    /// one. The server defaults to 0.
    pub offset: Option<u64>,
    /// The largest number of transfers to return, between
    /// [`MIN_PAGE_LIMIT`] and [`MAX_PAGE_LIMIT`].
    pub limit: Option<u32>,
    /// The sort key for the returned transfers.
    pub order: Option<TransferOrder>,
    /// The direction in which to apply the sort key.
    pub direction: Option<SortDirection>,
    /// Return only the transfers matching this filter.
    pub filter: Option<TransferFilter>,
}

impl ListTransfersQuery {
    /// Validate the query and render it into its wire parameters.
    fn to_params(&self) -> Result<ListTransfersParams, Error> {
        if let Some(limit) = self.limit {
            if !(MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT).contains(&limit) {
                return Err(Error::ParameterOutOfRange {
                    param: "limit",
                    value: limit.into(),
                    min: MIN_PAGE_LIMIT.into(),
                    max: MAX_PAGE_LIMIT.into(),
                });
            }
        }

        Ok(ListTransfersParams {
            with_total: self.with_total,
            offset: self.offset,
            limit: self.limit,
            order: self.order,
            direction: self.direction,
            filter: self.filter.as_ref().map(TransferFilter::encode).transpose()?,
        })
    }
}

/// A bulk edit of all of a customer's transfers matching a filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkEditRequest {
    /// The action to apply to the matching transfers.
    pub action: Option<BulkAction>,
    /// Apply the action only to the transfers matching this filter. When
    /// no filter is given the server applies the action to all of the
    /// customer's transfers.
    pub filter: Option<TransferFilter>,
}

impl BulkEditRequest {
    /// Render the bulk edit into its wire parameters.
    fn to_params(&self) -> Result<BulkEditParams, Error> {
        Ok(BulkEditParams {
            action: self.action,
            filter: self.filter.as_ref().map(TransferFilter::encode).transpose()?,
        })
    }
}

/// A trait detailing the interface with the transfer endpoints of the
/// monitor API.
///
/// Every operation resolves to the full response [`Envelope`]: the
/// operation specific payload stays under [`Envelope::data`] exactly as
/// the server sent it.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TransferApi {
    /// Attach a transaction to the customer with the given name, creating
    /// the customer if the name is not known yet.
    ///
    /// This is done by making a `POST /monitor/tx/add` request.
    fn record_transfer(
        &self,
        tx: &str,
        direction: TransferDirection,
        address: &str,
        customer_name: &str,
    ) -> impl Future<Output = Result<Envelope, Error>> + Send;

    /// Archive or restore a recorded transfer, or change its flag.
    ///
    /// This is done by making a `POST /monitor/tx/{transfer_id}/edit`
    /// request.
    fn edit_transfer(
        &self,
        transfer_id: &str,
        update: &TransferUpdate,
    ) -> impl Future<Output = Result<Envelope, Error>> + Send;

    /// Ask the server to rescore a recorded transfer and return its
    /// refreshed representation.
    ///
    /// This is done by making a `POST /monitor/tx/{transfer_id}/update`
    /// request.
    fn refresh_transfer(
        &self,
        transfer_id: &str,
    ) -> impl Future<Output = Result<Envelope, Error>> + Send;

    /// List the transfers recorded for a customer, with optional paging,
    /// ordering and filtering.
    ///
    /// This is done by making a `POST /monitor/one/{customer_token}/txs`
    /// request.
    fn list_customer_transfers(
        &self,
        customer_token: &str,
        query: &ListTransfersQuery,
    ) -> impl Future<Output = Result<Envelope, Error>> + Send;

    /// Retrieve the smallest and largest filterable values of a
    /// customer's transfers, for seeding filter widgets.
    ///
    /// This is done by making a `GET /monitor/one/{customer_token}/tx-bounds`
    /// request.
    fn get_transfer_bounds(
        &self,
        customer_token: &str,
    ) -> impl Future<Output = Result<Envelope, Error>> + Send;

    /// Apply one action to all of a customer's transfers matching a
    /// filter.
    ///
    /// This is done by making a `POST /monitor/one/{customer_token}/txs/execute`
    /// request.
    fn bulk_edit_customer_transfers(
        &self,
        customer_token: &str,
        request: &BulkEditRequest,
    ) -> impl Future<Output = Result<Envelope, Error>> + Send;
}

impl TransferApi for MonitorClient {
    #[tracing::instrument(skip_all)]
    async fn record_transfer(
        &self,
        tx: &str,
        direction: TransferDirection,
        address: &str,
        customer_name: &str,
    ) -> Result<Envelope, Error> {
        tracing::debug!(%tx, %direction, "recording a transfer with the monitor API");
        let params = RecordTransferParams {
            token_id: self.token_id,
            tx,
            direction,
            address,
            name: customer_name,
        };

        self.post("/monitor/tx/add", &params).await
    }

    #[tracing::instrument(skip_all)]
    async fn edit_transfer(
        &self,
        transfer_id: &str,
        update: &TransferUpdate,
    ) -> Result<Envelope, Error> {
        tracing::debug!(%transfer_id, "editing a recorded transfer");
        let path = format!("/monitor/tx/{transfer_id}/edit");

        self.post(&path, update).await
    }

    #[tracing::instrument(skip_all)]
    async fn refresh_transfer(&self, transfer_id: &str) -> Result<Envelope, Error> {
        tracing::debug!(%transfer_id, "requesting a rescore of a recorded transfer");
        let path = format!("/monitor/tx/{transfer_id}/update");

        let request = self.request(Method::POST, &path)?;
        self.send(request).await
    }

    #[tracing::instrument(skip_all)]
    async fn list_customer_transfers(
        &self,
        customer_token: &str,
        query: &ListTransfersQuery,
    ) -> Result<Envelope, Error> {
        tracing::debug!(%customer_token, "listing the transfers recorded for a customer");
        let params = query.to_params()?;
        let path = format!("/monitor/one/{customer_token}/txs");

        self.post(&path, &params).await
    }

    #[tracing::instrument(skip_all)]
    async fn get_transfer_bounds(&self, customer_token: &str) -> Result<Envelope, Error> {
        tracing::debug!(%customer_token, "fetching the transfer bounds of a customer");
        let path = format!("/monitor/one/{customer_token}/tx-bounds");

        self.get(&path).await
    }

    #[tracing::instrument(skip_all)]
    async fn bulk_edit_customer_transfers(
        &self,
        customer_token: &str,
        request: &BulkEditRequest,
    ) -> Result<Envelope, Error> {
        tracing::debug!(%customer_token, "applying a bulk edit to a customer's transfers");
        let params = request.to_params()?;
        let path = format!("/monitor/one/{customer_token}/txs/execute");

        self.post(&path, &params).await
    }
}

/// The wire parameters of the transfer recording endpoint.
#[derive(Serialize)]
struct RecordTransferParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    token_id: Option<u16>,
    tx: &'a str,
    direction: TransferDirection,
    address: &'a str,
    name: &'a str,
}

/// The wire parameters of the transfer listing endpoint.
#[derive(Serialize)]
struct ListTransfersParams {
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "bool_as_int")]
    with_total: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<TransferOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<SortDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

/// The wire parameters of the bulk edit endpoint.
#[derive(Serialize)]
struct BulkEditParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<BulkAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

/// Serialize a flag in the 0 or 1 integer form that the monitor API
/// expects for `with_total`.
fn bool_as_int<S>(flag: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match flag {
        Some(flag) => serializer.serialize_u8(u8::from(*flag)),
        None => serializer.serialize_none(),
    }
}

/// Parse the wire form of an enumerated parameter, naming the parameter
/// and its allowed values in the error when the value is not accepted.
fn parse_param<T>(param: &'static str, value: &str) -> Result<T, Error>
where
    T: FromStr + strum::VariantNames,
{
    value.parse().map_err(|_| Error::InvalidParameter {
        param,
        value: value.to_string(),
        allowed: T::VARIANTS,
    })
}
