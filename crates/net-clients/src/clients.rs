//! Thin unary/streaming wrappers around the execution node's non-KV RPC
//! services (spec.md §4.10, C11): backend (etherbase, version, engine API),
//! mining, and tx-pool. Each method is a direct wire translation with no
//! business logic, per spec.md §4.10.

use crate::remote::eth_backend_client::EthBackendClient;
use crate::remote::{
    self, EngineForkChoiceStateV1, EngineForkChoiceUpdatedReply, EngineForkChoiceUpdatedRequest,
    EngineGetPayloadV1Request, EnginePayloadAttributesV1, EnginePayloadStatus, ExecutionPayloadV1,
};
use crate::txpool::mining_client::MiningClient as WireMiningClient;
use crate::txpool::txpool_client::TxpoolClient as WireTxpoolClient;
use crate::txpool::{
    AddReply, AddRequest, AllReply, AllRequest, GetWorkReply, GetWorkRequest, HashRateReply, HashRateRequest,
    MiningReply, MiningRequest, NonceReply, NonceRequest, StatusReply, StatusRequest, SubmitHashRateReply,
    SubmitHashRateRequest, SubmitWorkReply, SubmitWorkRequest, TransactionsReply, TransactionsRequest,
};
use rpcdaemon_errors::{DbError, DbResult};
use tonic::transport::Channel;
use tonic::Request;

/// Connect a lazily-resolved channel to the remote node's single endpoint
/// (spec.md §6: "Two service groups on one remote endpoint").
pub async fn connect(endpoint: impl Into<String>) -> DbResult<Channel> {
    let endpoint = endpoint.into();
    tonic::transport::Endpoint::from_shared(endpoint.clone())
        .map_err(|err| DbError::Transport(format!("invalid endpoint {endpoint}: {err}")))?
        .connect()
        .await
        .map_err(|err| DbError::Transport(format!("connect to {endpoint} failed: {err}")))
}

/// Raw generated `remote.KV` client, re-exported for `rpcdaemon-remote-db`
/// and `rpcdaemon-state-cache`, which need to drive the `Tx` bidi stream
/// and `StateChanges` server stream directly rather than through a unary
/// wrapper.
pub type KvRawClient = remote::kv_client::KvClient<Channel>;

/// `remote.ETHBACKEND` wrapper: etherbase, net/protocol/client version,
/// peer count, and the engine API (spec.md §4.10).
#[derive(Debug, Clone)]
pub struct BackendClient {
    inner: EthBackendClient<Channel>,
}

impl BackendClient {
    /// Wrap an already-connected channel.
    pub fn new(channel: Channel) -> Self {
        Self { inner: EthBackendClient::new(channel) }
    }

    /// `eth_coinbase` / `eth_etherbase` backing call.
    pub async fn etherbase(&mut self) -> DbResult<alloy_primitives::Address> {
        let reply = self.inner.etherbase(Request::new(remote::EtherbaseRequest {})).await?.into_inner();
        Ok(reply.address.as_ref().map(crate::address_from_h160).unwrap_or_default())
    }

    /// `net_version`.
    pub async fn net_version(&mut self) -> DbResult<u64> {
        Ok(self.inner.net_version(Request::new(remote::NetVersionRequest {})).await?.into_inner().id)
    }

    /// `eth_protocolVersion`.
    pub async fn protocol_version(&mut self) -> DbResult<u64> {
        Ok(self.inner.protocol_version(Request::new(remote::ProtocolVersionRequest {})).await?.into_inner().id)
    }

    /// `web3_clientVersion`.
    pub async fn client_version(&mut self) -> DbResult<String> {
        Ok(self.inner.client_version(Request::new(remote::ClientVersionRequest {})).await?.into_inner().node_name)
    }

    /// `net_peerCount`.
    pub async fn net_peer_count(&mut self) -> DbResult<u64> {
        Ok(self.inner.net_peer_count(Request::new(remote::NetPeerCountRequest {})).await?.into_inner().count)
    }

    /// `engine_getPayloadV1`.
    pub async fn engine_get_payload_v1(&mut self, payload_id: u64) -> DbResult<ExecutionPayloadV1> {
        Ok(self.inner.engine_get_payload_v1(Request::new(EngineGetPayloadV1Request { payload_id })).await?.into_inner())
    }

    /// `engine_newPayloadV1`.
    pub async fn engine_new_payload_v1(&mut self, payload: ExecutionPayloadV1) -> DbResult<EnginePayloadStatus> {
        Ok(self.inner.engine_new_payload_v1(Request::new(payload)).await?.into_inner())
    }

    /// `engine_forkchoiceUpdatedV1`.
    pub async fn engine_forkchoice_updated_v1(
        &mut self,
        fork_choice_state: EngineForkChoiceStateV1,
        payload_attributes: Option<EnginePayloadAttributesV1>,
    ) -> DbResult<EngineForkChoiceUpdatedReply> {
        let req = EngineForkChoiceUpdatedRequest { fork_choice_state: Some(fork_choice_state), payload_attributes };
        Ok(self.inner.engine_fork_choice_updated_v1(Request::new(req)).await?.into_inner())
    }
}

/// `txpool.Mining` wrapper (spec.md §4.10): GetWork, SubmitWork,
/// SubmitHashRate, HashRate, Mining.
#[derive(Debug, Clone)]
pub struct MiningClient {
    inner: WireMiningClient<Channel>,
}

impl MiningClient {
    pub fn new(channel: Channel) -> Self {
        Self { inner: WireMiningClient::new(channel) }
    }

    pub async fn get_work(&mut self) -> DbResult<GetWorkReply> {
        Ok(self.inner.get_work(Request::new(GetWorkRequest {})).await?.into_inner())
    }

    pub async fn submit_work(&mut self, req: SubmitWorkRequest) -> DbResult<SubmitWorkReply> {
        Ok(self.inner.submit_work(Request::new(req)).await?.into_inner())
    }

    pub async fn submit_hash_rate(&mut self, req: SubmitHashRateRequest) -> DbResult<SubmitHashRateReply> {
        Ok(self.inner.submit_hash_rate(Request::new(req)).await?.into_inner())
    }

    pub async fn hash_rate(&mut self) -> DbResult<HashRateReply> {
        Ok(self.inner.hash_rate(Request::new(HashRateRequest {})).await?.into_inner())
    }

    pub async fn mining(&mut self) -> DbResult<MiningReply> {
        Ok(self.inner.mining(Request::new(MiningRequest {})).await?.into_inner())
    }
}

/// `txpool.Txpool` wrapper (spec.md §4.10): Add, Transactions, Nonce,
/// Status, All.
#[derive(Debug, Clone)]
pub struct TxPoolClient {
    inner: WireTxpoolClient<Channel>,
}

impl TxPoolClient {
    pub fn new(channel: Channel) -> Self {
        Self { inner: WireTxpoolClient::new(channel) }
    }

    pub async fn add(&mut self, rlp_txs: Vec<Vec<u8>>) -> DbResult<AddReply> {
        Ok(self.inner.add(Request::new(AddRequest { rlp_txs })).await?.into_inner())
    }

    pub async fn transactions(&mut self, hashes: Vec<alloy_primitives::B256>) -> DbResult<TransactionsReply> {
        let hashes = hashes.iter().map(crate::b256_to_h256).collect();
        Ok(self.inner.transactions(Request::new(TransactionsRequest { hashes })).await?.into_inner())
    }

    pub async fn nonce(&mut self, address: alloy_primitives::Address) -> DbResult<NonceReply> {
        let req = NonceRequest { address: Some(crate::address_to_h160(&address)) };
        Ok(self.inner.nonce(Request::new(req)).await?.into_inner())
    }

    pub async fn status(&mut self) -> DbResult<StatusReply> {
        Ok(self.inner.status(Request::new(StatusRequest {})).await?.into_inner())
    }

    pub async fn all(&mut self) -> DbResult<AllReply> {
        Ok(self.inner.all(Request::new(AllRequest {})).await?.into_inner())
    }
}
