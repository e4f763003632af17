// Auto-implements ToFromNetworkOrder for a fieldless enum that already has
// Default/TryFrom<u8>/TryFrom<u16> from #[derive(DnsEnum)]. The wire codec
// itself (how many bytes, which byte order) is the part DnsEnum can't infer,
// so it's supplied here per width.
#[macro_export]
macro_rules! derive_enum {
    ($t:ty, u8) => {
        impl<'a> $crate::wire::ToFromNetworkOrder<'a> for $t {
            fn to_network_bytes(
                &self,
                buffer: &mut $crate::wire::WireWriter,
            ) -> $crate::error::DnsSdResult<usize> {
                buffer.push(*self as u8);
                Ok(1)
            }

            fn from_network_bytes(
                &mut self,
                buffer: &mut std::io::Cursor<&'a [u8]>,
            ) -> $crate::error::DnsSdResult<()> {
                use byteorder::ReadBytesExt;
                let value = buffer.read_u8()?;
                *self = <$t>::try_from(value)
                    .map_err($crate::error::DnsSdError::invalid_message)?;
                Ok(())
            }
        }
    };

    ($t:ty, u16) => {
        impl<'a> $crate::wire::ToFromNetworkOrder<'a> for $t {
            fn to_network_bytes(
                &self,
                buffer: &mut $crate::wire::WireWriter,
            ) -> $crate::error::DnsSdResult<usize> {
                use byteorder::WriteBytesExt;
                buffer.write_u16::<byteorder::BigEndian>(*self as u16)?;
                Ok(2)
            }

            fn from_network_bytes(
                &mut self,
                buffer: &mut std::io::Cursor<&'a [u8]>,
            ) -> $crate::error::DnsSdResult<()> {
                use byteorder::ReadBytesExt;
                let value = buffer.read_u16::<byteorder::BigEndian>()?;
                *self = <$t>::try_from(value)
                    .map_err($crate::error::DnsSdError::invalid_message)?;
                Ok(())
            }
        }
    };
}
